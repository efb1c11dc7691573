use std::collections::HashMap;

use crate::latex::escape::{escape_latex, escape_url};
use crate::latex::format::{
    format_certifications, format_education, format_experience, format_list, format_projects,
};
use crate::latex::style::{TemplateKey, TemplateStyle};
use crate::models::resume::ResumeContent;

/// Placeholder tokens a template may contain, written `{{name}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    FullName,
    Email,
    Linkedin,
    Github,
    Education,
    Experience,
    Projects,
    Skills,
    Languages,
    Certifications,
}

impl Placeholder {
    pub const ALL: [Placeholder; 10] = [
        Placeholder::FullName,
        Placeholder::Email,
        Placeholder::Linkedin,
        Placeholder::Github,
        Placeholder::Education,
        Placeholder::Experience,
        Placeholder::Projects,
        Placeholder::Skills,
        Placeholder::Languages,
        Placeholder::Certifications,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::FullName => "fullName",
            Placeholder::Email => "email",
            Placeholder::Linkedin => "linkedin",
            Placeholder::Github => "github",
            Placeholder::Education => "education",
            Placeholder::Experience => "experience",
            Placeholder::Projects => "projects",
            Placeholder::Skills => "skills",
            Placeholder::Languages => "languages",
            Placeholder::Certifications => "certifications",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Placeholder::ALL.into_iter().find(|p| p.name() == name)
    }

    #[cfg(test)]
    pub fn token(self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

/// Renders the complete LaTeX source for `content` using the template `key`.
pub fn render_document(content: &ResumeContent, key: TemplateKey) -> String {
    render_with_source(content, key.style(), key.source())
}

pub fn render_with_source(content: &ResumeContent, style: &TemplateStyle, source: &str) -> String {
    substitute(source, &build_fragments(content, style))
}

fn section(style: &TemplateStyle, title: &str, body: String) -> String {
    if body.is_empty() {
        return String::new();
    }
    format!("{}\n{}", style.heading(title), body)
}

fn build_fragments(content: &ResumeContent, style: &TemplateStyle) -> HashMap<Placeholder, String> {
    let mut fragments = HashMap::new();

    if let Some(personal) = content.personal() {
        fragments.insert(Placeholder::FullName, escape_latex(personal.full_name.trim()));

        let email = personal.email.trim();
        let mut contact_started = false;
        if !email.is_empty() {
            fragments.insert(
                Placeholder::Email,
                format!(r"\href{{mailto:{}}}{{{}}}", escape_url(email), escape_latex(email)),
            );
            contact_started = true;
        }
        for (placeholder, url, label) in [
            (Placeholder::Linkedin, personal.linkedin.as_deref(), "LinkedIn"),
            (Placeholder::Github, personal.github.as_deref(), "GitHub"),
        ] {
            let url = url.map(escape_url).unwrap_or_default();
            if url.is_empty() {
                continue;
            }
            let separator = if contact_started { style.contact_separator } else { "" };
            fragments.insert(placeholder, format!(r"{separator}\href{{{url}}}{{{label}}}"));
            contact_started = true;
        }
    }

    fragments.insert(
        Placeholder::Education,
        section(style, "Education", format_education(&content.education)),
    );
    fragments.insert(
        Placeholder::Experience,
        section(style, "Experience", format_experience(&content.experience)),
    );
    fragments.insert(
        Placeholder::Projects,
        section(style, "Projects", format_projects(&content.projects)),
    );
    fragments.insert(
        Placeholder::Skills,
        section(style, "Skills", format_list(&content.skills, style.skills)),
    );
    fragments.insert(
        Placeholder::Languages,
        section(style, "Languages", format_list(&content.languages, style.languages)),
    );
    fragments.insert(
        Placeholder::Certifications,
        section(
            style,
            "Certifications",
            format_certifications(&content.certifications, style.certifications),
        ),
    );

    fragments
}

/// Replaces every `{{name}}` token naming a known placeholder. Known
/// placeholders without a fragment become empty; unknown names and ordinary
/// LaTeX braces pass through untouched. Fragments are inserted verbatim and
/// never rescanned.
pub fn substitute(source: &str, fragments: &HashMap<Placeholder, String>) -> String {
    let mut out = String::with_capacity(source.len() * 2);
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let token = tail
            .find("}}")
            .and_then(|end| Placeholder::from_name(&tail[..end]).map(|p| (p, end)));
        match token {
            Some((placeholder, end)) => {
                if let Some(fragment) = fragments.get(&placeholder) {
                    out.push_str(fragment);
                }
                rest = &tail[end + 2..];
            }
            None => {
                out.push('{');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
