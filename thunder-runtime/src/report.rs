//! HTML report
//!
//! Renders a standalone report for one analysis. All user-controlled text
//! is escaped.

use chrono::{DateTime, Local};
use html_escape::encode_text;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::IdentityAnalysis;

/// Overall judgement derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Consistent,
    Moderate,
    HighRisk,
}

impl Verdict {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            Verdict::Consistent
        } else if score >= 50 {
            Verdict::Moderate
        } else {
            Verdict::HighRisk
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Verdict::Consistent => "#00ff99",
            Verdict::Moderate => "#ffaa00",
            Verdict::HighRisk => "#ff4444",
        }
    }

    pub fn conclusion(&self) -> &'static str {
        match self {
            Verdict::Consistent => "Highly consistent profile. Low risk of being fake.",
            Verdict::Moderate => "Moderately consistent profile. Manual verification required.",
            Verdict::HighRisk => "Low consistency or very recent profile. High risk of being fake.",
        }
    }
}

const STYLE: &str = r#"
    body { background:#111; color:#eee; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; padding:40px; line-height:1.6; }
    .container { max-width:800px; margin:auto; background:#1e1e1e; padding:20px; border-radius:10px; box-shadow:0 4px 15px rgba(0,0,0,0.5); }
    h1 { color:#00d4ff; border-bottom:2px solid #333; padding-bottom:10px; }
    .score-container { background:#333; border-radius:20px; width:100%; height:35px; overflow:hidden; margin:20px 0; border:1px solid #444; }
    .score-bar { height:100%; text-align:center; line-height:35px; font-weight:bold; color:#000; }
    .conclusion { font-size:1.2em; font-weight:bold; background:rgba(0,0,0,0.2); padding:10px; border-left:5px solid; }
    table { width:100%; border-collapse:collapse; margin-top:20px; }
    th, td { padding:12px; text-align:left; border-bottom:1px solid #333; }
    th { background:#252525; color:#00d4ff; }
    tr:hover { background:#2a2a2a; }
    .footer { margin-top:30px; font-size:0.8em; color:#666; text-align:center; }
"#;

/// Render the report document
pub fn render_html(analysis: &IdentityAnalysis, generated_at: DateTime<Local>) -> String {
    let verdict = Verdict::from_score(analysis.score);
    let color = verdict.color();
    let target = encode_text(&analysis.target);

    let rows: String = analysis
        .handles
        .iter()
        .map(|h| {
            format!(
                "        <tr><td>{}</td><td>{}%</td><td>{}</td><td>{}</td></tr>\n",
                encode_text(&h.handle),
                h.similarity_percent(),
                h.level,
                h.age
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>OSINT Report - {target}</title>
    <style>{STYLE}</style>
</head>
<body>
<div class="container">
    <h1>OSINT Identity Report</h1>
    <p><strong>Target:</strong> {target} | <strong>Date:</strong> {date}</p>
    <div class="score-container">
        <div class="score-bar" style="width:{score}%; background:{color};">{score}%</div>
    </div>
    <div class="conclusion" style="color:{color}; border-color:{color};">{conclusion}</div>
    <table>
        <thead>
        <tr><th>Handle Found</th><th>Similarity</th><th>Level</th><th>Age (GitHub)</th></tr>
        </thead>
        <tbody>
{rows}        </tbody>
    </table>
    <div class="footer">Generated by Sherlock Thunder {version}</div>
</div>
</body>
</html>
"#,
        date = generated_at.format("%Y-%m-%d %H:%M:%S"),
        score = analysis.score,
        conclusion = verdict.conclusion(),
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Report file path for a target inside `dir`
pub fn report_path(dir: &Path, target: &str) -> PathBuf {
    let safe: String = target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
        .collect();
    dir.join(format!("{}_report.html", safe))
}

/// Render and write the report, creating `dir` if needed
pub fn write_report(analysis: &IdentityAnalysis, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = report_path(dir, &analysis.target);
    std::fs::write(&path, render_html(analysis, Local::now()))?;
    info!("Report saved to {}", path.display());
    Ok(path)
}
