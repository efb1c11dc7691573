//! Section formatters. Each turns a slice of entries into a LaTeX fragment
//! without a section heading; headings belong to the renderer. Empty input
//! always yields an empty fragment.

use chrono::NaiveDate;

use crate::latex::escape::{escape_latex, escape_opt, escape_url};
use crate::latex::style::ListStyle;
use crate::models::resume::{Certification, EducationEntry, ExperienceEntry, ProjectEntry};

const PRESENT: &str = "Present";

/// "Mon YYYY", English month abbreviations regardless of host locale.
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%b %Y").to_string())
        .unwrap_or_default()
}

fn date_range(start: Option<NaiveDate>, end: &str) -> String {
    let start = format_date(start);
    match (start.is_empty(), end.is_empty()) {
        (true, true) => String::new(),
        (false, true) => start,
        (true, false) => end.to_string(),
        (false, false) => format!("{start} -- {end}"),
    }
}

/// `\href{url}{label}` when a non-blank link exists, the bare label otherwise.
/// `label` must already be LaTeX-safe.
pub fn format_link(url: Option<&str>, label: &str) -> String {
    match url.map(escape_url).filter(|u| !u.is_empty()) {
        Some(url) => format!(r"\href{{{url}}}{{{label}}}"),
        None => label.to_string(),
    }
}

fn bullet_list(items: &[String], indent: &str) -> String {
    let items: Vec<&String> = items.iter().filter(|s| !s.trim().is_empty()).collect();
    if items.is_empty() {
        return String::new();
    }
    let mut out = format!("{indent}\\begin{{itemize}}\n");
    for item in items {
        out.push_str(&format!("{indent}  \\item {}\n", escape_latex(item)));
    }
    out.push_str(&format!("{indent}\\end{{itemize}}\n"));
    out
}

pub fn format_education(entries: &[EducationEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut out = String::from("\\begin{itemize}\n");
    for edu in entries {
        let end = match edu.end_date {
            Some(_) => format_date(edu.end_date),
            None => PRESENT.to_string(),
        };
        out.push_str(&format!(
            "  \\item \\textbf{{{}}} \\hfill {}\\\\\n",
            escape_latex(&edu.institution),
            date_range(edu.start_date, &end)
        ));
        out.push_str(&format!("  {}", escape_latex(&edu.degree)));
        match edu
            .related_coursework
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        {
            Some(coursework) => out.push_str(&format!(
                "\\\\\n  \\textit{{Related Coursework:}} {}\n",
                escape_latex(coursework)
            )),
            None => out.push('\n'),
        }
    }
    out.push_str("\\end{itemize}\n");
    out
}

pub fn format_experience(entries: &[ExperienceEntry]) -> String {
    let mut out = String::new();
    for exp in entries {
        let end = if exp.currently_working {
            PRESENT.to_string()
        } else {
            format_date(exp.end_date)
        };
        out.push_str(&format!(
            "\\noindent\\textbf{{{}}} \\hfill {}\\\\\n",
            escape_latex(&exp.company_name),
            escape_opt(exp.location.as_deref())
        ));
        out.push_str(&format!(
            "\\textit{{{}}}\n",
            date_range(exp.start_date, &end)
        ));
        out.push_str(&bullet_list(&exp.responsibilities, ""));
        out.push('\n');
    }
    out
}

pub fn format_projects(entries: &[ProjectEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut out = String::from("\\begin{itemize}\n");
    for project in entries {
        let title = format!("\\textbf{{{}}}", escape_latex(&project.name));
        out.push_str(&format!(
            "  \\item {}\n",
            format_link(project.link.as_deref(), &title)
        ));
        out.push_str(&bullet_list(&project.description, "  "));
    }
    out.push_str("\\end{itemize}\n");
    out
}

/// Skills and languages. The join strategy comes from the template style.
pub fn format_list(items: &[String], style: ListStyle) -> String {
    let escaped: Vec<String> = items
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| escape_latex(s.trim()))
        .collect();
    layout_items(&escaped, style)
}

pub fn format_certifications(certs: &[Certification], style: ListStyle) -> String {
    let rendered: Vec<String> = certs
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| format_link(c.link.as_deref(), &escape_latex(c.name.trim())))
        .collect();
    layout_items(&rendered, style)
}

fn layout_items(items: &[String], style: ListStyle) -> String {
    if items.is_empty() {
        return String::new();
    }
    match style {
        ListStyle::Inline(separator) => format!(
            "\\begin{{itemize}}\n  \\item {}\n\\end{{itemize}}\n",
            items.join(separator)
        ),
        ListStyle::PerLine => {
            let mut out = String::from("\\begin{itemize}\n");
            for item in items {
                out.push_str(&format!("  \\item {item}\n"));
            }
            out.push_str("\\end{itemize}\n");
            out
        }
    }
}
