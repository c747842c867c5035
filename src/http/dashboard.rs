//! Server-rendered dashboard page.

use std::fmt::Write;

use crate::quake::{GlobalQuake, JpQuake};

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;background:#111;color:#eee}\
table{border-collapse:collapse;width:100%;margin-bottom:2rem}\
th,td{border-bottom:1px solid #333;padding:.3rem .6rem;text-align:left}\
th{color:#9cf}.latest{padding:.6rem;border:1px solid #9cf;margin-bottom:1rem}";

pub fn render(
    jp: &[JpQuake],
    global: &[GlobalQuake],
    latest_jp: Option<&JpQuake>,
    latest_global: Option<&GlobalQuake>,
) -> String {
    let mut page = String::with_capacity(16 * 1024);
    page.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    page.push_str("<title>quakewatch</title><style>");
    page.push_str(STYLE);
    page.push_str("</style></head><body><h1>quakewatch</h1>");

    page.push_str("<h2>Japan</h2>");
    if let Some(q) = latest_jp {
        let _ = write!(
            page,
            "<div class=\"latest\">Latest: {} {} {} M{} shindo {}</div>",
            escape(q.date.as_deref().unwrap_or("")),
            escape(q.time.as_deref().unwrap_or("")),
            escape(q.epicenter.as_deref().unwrap_or("")),
            magnitude(q.magnitude),
            escape(q.intensity.as_str()),
        );
    }
    jp_table(&mut page, jp);

    page.push_str("<h2>Global</h2>");
    if let Some(q) = latest_global {
        let _ = write!(
            page,
            "<div class=\"latest\">Latest: {} {} {} M{}</div>",
            escape(&q.date),
            escape(&q.time),
            escape(&q.title),
            q.magnitude,
        );
    }
    global_table(&mut page, global);

    page.push_str("</body></html>");
    page
}

fn jp_table(page: &mut String, rows: &[JpQuake]) {
    page.push_str(
        "<table><tr><th>Date</th><th>Time</th><th>Epicenter</th><th>Magnitude</th>\
         <th>Shindo</th><th>Lat</th><th>Lon</th></tr>",
    );
    for q in rows {
        let _ = write!(
            page,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(q.date.as_deref().unwrap_or("")),
            escape(q.time.as_deref().unwrap_or("")),
            escape(q.epicenter.as_deref().unwrap_or("")),
            magnitude(q.magnitude),
            escape(q.intensity.as_str()),
            coordinate(q.lat),
            coordinate(q.lon),
        );
    }
    page.push_str("</table>");
}

fn global_table(page: &mut String, rows: &[GlobalQuake]) {
    page.push_str(
        "<table><tr><th>Date (UTC)</th><th>Time</th><th>Magnitude</th><th>Location</th>\
         <th>Tsunami</th><th>Lat</th><th>Lon</th></tr>",
    );
    for q in rows {
        let _ = write!(
            page,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&q.date),
            escape(&q.time),
            q.magnitude,
            escape(&q.location),
            if q.tsunami { "yes" } else { "" },
            coordinate(q.lat),
            coordinate(q.lon),
        );
    }
    page.push_str("</table>");
}

fn magnitude(value: Option<f64>) -> String {
    value.map_or_else(|| crate::quake::NOT_REPORTED.to_string(), |m| m.to_string())
}

fn coordinate(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// -- Tests -------------------------------------------------------------------
