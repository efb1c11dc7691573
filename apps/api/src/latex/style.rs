use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing template: '{0}' is not a known template")]
    Unknown(String),
}

/// The fixed, versioned set of templates. Adding a template means adding a
/// variant, its source file and its style; the renderer does not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    Template1,
    Template2,
    Template3,
    Template4,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 4] = [
        TemplateKey::Template1,
        TemplateKey::Template2,
        TemplateKey::Template3,
        TemplateKey::Template4,
    ];

    /// Used when a record carries no template key at all.
    pub const DEFAULT: TemplateKey = TemplateKey::Template1;

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKey::Template1 => "template1",
            TemplateKey::Template2 => "template2",
            TemplateKey::Template3 => "template3",
            TemplateKey::Template4 => "template4",
        }
    }

    /// An absent or blank key falls back to the default; a key that is present
    /// but unrecognised is an error.
    pub fn resolve(raw: Option<&str>) -> Result<Self, TemplateError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::DEFAULT),
            Some(key) => key.parse(),
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            TemplateKey::Template1 => include_str!("../../templates/template1.tex"),
            TemplateKey::Template2 => include_str!("../../templates/template2.tex"),
            TemplateKey::Template3 => include_str!("../../templates/template3.tex"),
            TemplateKey::Template4 => include_str!("../../templates/template4.tex"),
        }
    }

    pub fn style(self) -> &'static TemplateStyle {
        match self {
            TemplateKey::Template1 => &CLASSIC,
            TemplateKey::Template2 => &RULED,
            TemplateKey::Template3 => &SMALL_CAPS,
            TemplateKey::Template4 => &COMPACT,
        }
    }
}

impl FromStr for TemplateKey {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| TemplateError::Unknown(s.to_string()))
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a flat list (skills, languages, certifications) is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// One `\item` holding every entry joined by the separator.
    Inline(&'static str),
    /// One `\item` per entry.
    PerLine,
}

/// Per-template formatting policy, resolved once per render and passed to
/// every formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStyle {
    /// Wraps a section title: `open` + title + `close`.
    pub heading_open: &'static str,
    pub heading_close: &'static str,
    /// Placed between contact items (email, LinkedIn, GitHub).
    pub contact_separator: &'static str,
    pub skills: ListStyle,
    pub languages: ListStyle,
    pub certifications: ListStyle,
}

impl TemplateStyle {
    pub fn heading(&self, title: &str) -> String {
        format!("{}{}{}", self.heading_open, title, self.heading_close)
    }
}

static CLASSIC: TemplateStyle = TemplateStyle {
    heading_open: r"\section*{",
    heading_close: "}",
    contact_separator: r" $\vert$ ",
    skills: ListStyle::Inline(r" $\bullet$ "),
    languages: ListStyle::Inline(", "),
    certifications: ListStyle::PerLine,
};

static RULED: TemplateStyle = TemplateStyle {
    heading_open: r"\resumesection{",
    heading_close: "}",
    contact_separator: r" \textbar{} ",
    skills: ListStyle::PerLine,
    languages: ListStyle::PerLine,
    certifications: ListStyle::PerLine,
};

static SMALL_CAPS: TemplateStyle = TemplateStyle {
    heading_open: r"\section*{\textsc{",
    heading_close: "}}",
    contact_separator: r" \\ ",
    skills: ListStyle::Inline(r" $|$ "),
    languages: ListStyle::Inline(r" $|$ "),
    certifications: ListStyle::Inline(r" $|$ "),
};

static COMPACT: TemplateStyle = TemplateStyle {
    heading_open: r"\subsection*{",
    heading_close: "}",
    contact_separator: r" $\cdot$ ",
    skills: ListStyle::Inline(", "),
    languages: ListStyle::Inline(", "),
    certifications: ListStyle::PerLine,
};
