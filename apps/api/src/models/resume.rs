use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDetails {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default, with = "flexible_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "flexible_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, alias = "coursework")]
    pub related_coursework: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    #[serde(default, alias = "company")]
    pub company_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, with = "flexible_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "flexible_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub currently_working: bool,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
}

/// User-authored resume sections. Persisted as a single JSONB document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeContent {
    /// Form shape is an array; at most one entry is accepted.
    #[serde(default)]
    pub personal_details: Vec<PersonalDetails>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

impl ResumeContent {
    pub fn personal(&self) -> Option<&PersonalDetails> {
        self.personal_details.first()
    }
}

/// Storage references written only by the render pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRefs {
    pub preview_image: Option<String>,
    pub pdf_path: Option<String>,
    pub latex_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: Uuid,
    #[serde(rename = "user")]
    /// Opaque identifier issued by the identity service.
    pub user_id: String,
    pub name: String,
    pub template: String,
    #[serde(flatten)]
    pub content: ResumeContent,
    #[serde(flatten)]
    pub artifacts: ArtifactRefs,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ResumeRecord {
    pub fn new(user_id: String, name: String, template: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            template,
            content: ResumeContent::default(),
            artifacts: ArtifactRefs::default(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Merges a partial update into the record. Every call counts as a content
    /// mutation and bumps `last_updated`.
    pub fn apply(&mut self, update: ResumeUpdate) {
        let ResumeUpdate {
            name,
            template,
            personal_details,
            education,
            experience,
            projects,
            skills,
            languages,
            certifications,
        } = update;

        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(template) = template {
            self.template = template.trim().to_string();
        }
        if let Some(personal_details) = personal_details {
            self.content.personal_details = personal_details;
        }
        if let Some(education) = education {
            self.content.education = education;
        }
        if let Some(mut experience) = experience {
            for entry in experience.iter_mut().filter(|e| e.currently_working) {
                entry.end_date = None;
            }
            self.content.experience = experience;
        }
        if let Some(projects) = projects {
            self.content.projects = projects;
        }
        if let Some(skills) = skills {
            self.content.skills = skills;
        }
        if let Some(languages) = languages {
            self.content.languages = languages;
        }
        if let Some(certifications) = certifications {
            self.content.certifications = certifications;
        }
        self.last_updated = Utc::now();
    }
}

/// Body of `POST /create/:userId`. Both fields are required; they are optional
/// here so that a missing field surfaces as a validation error, not a 422.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateResumeRequest {
    pub name: Option<String>,
    pub template: Option<String>,
}

/// Body of `POST /update/:id`. Absent fields are left untouched; artifact
/// references are not accepted from clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUpdate {
    pub name: Option<String>,
    pub template: Option<String>,
    pub personal_details: Option<Vec<PersonalDetails>>,
    pub education: Option<Vec<EducationEntry>>,
    pub experience: Option<Vec<ExperienceEntry>>,
    pub projects: Option<Vec<ProjectEntry>>,
    pub skills: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub certifications: Option<Vec<Certification>>,
}

impl ResumeUpdate {
    /// Structural checks that do not need the stored record.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Resume name cannot be empty".to_string());
            }
        }
        if let Some(details) = &self.personal_details {
            if details.len() > 1 {
                return Err(format!(
                    "personalDetails accepts at most one entry, got {}",
                    details.len()
                ));
            }
        }
        Ok(())
    }
}

/// Accepts the date shapes the form produces: `YYYY-MM-DD`, `YYYY-MM`, or a
/// full RFC 3339 timestamp. `null` and `""` both mean absent.
pub mod flexible_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date '{s}'"))),
        }
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc).date_naive())
            })
            .or_else(|| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok())
    }
}
