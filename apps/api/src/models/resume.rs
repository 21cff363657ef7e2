//! Resume data snapshot consumed by the block renderer.
//!
//! These types mirror the fields the form/CRUD layer produces. Validation is done
//! upstream; everything optional here degrades to "section omitted" downstream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeType {
    #[default]
    Campus,
    Social,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceType {
    #[default]
    Work,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Employed,
    Unemployed,
    Student,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    pub school_name: String,
    pub degree: String,
    pub major: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub gpa: Option<String>,
    pub courses: Option<String>,
    pub honors: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkExperienceEntry {
    #[serde(default)]
    pub exp_type: ExperienceType,
    pub company_name: String,
    pub position: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub project_name: String,
    #[serde(default)]
    pub role: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_link: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillEntry {
    pub skill_name: String,
    #[serde(default)]
    pub proficiency: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub language: String,
    #[serde(default)]
    pub proficiency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwardEntry {
    pub award_name: String,
    pub award_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub work_name: String,
    pub work_link: Option<String>,
    pub attachment_url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinkEntry {
    pub platform: String,
    pub url: String,
}

/// One immutable snapshot of a resume, as handed over by the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeData {
    #[serde(default)]
    pub resume_type: ResumeType,
    pub title: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// Encoded avatar image. Only its presence matters for layout.
    pub avatar: Option<String>,
    /// Height/width ratio of the avatar frame: "1.4" (portrait) or "1" (square).
    pub avatar_ratio: Option<String>,
    pub current_city: Option<String>,
    pub target_cities: Option<String>,
    pub job_status: Option<JobStatus>,
    pub target_positions: Option<String>,
    pub work_years: Option<u32>,
    pub current_company: Option<String>,
    pub current_position: Option<String>,
    pub expected_salary: Option<String>,
    pub self_evaluation: Option<String>,

    #[serde(default)]
    pub educations: Vec<EducationEntry>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
    #[serde(default)]
    pub awards: Vec<AwardEntry>,
    #[serde(default)]
    pub portfolios: Vec<PortfolioEntry>,
    #[serde(default)]
    pub social_links: Vec<SocialLinkEntry>,
}

impl ResumeData {
    /// Avatar frame ratio, falling back to the portrait default for unknown values.
    pub fn avatar_ratio(&self) -> f32 {
        match self.avatar_ratio.as_deref().map(str::trim) {
            Some("1") => 1.0,
            _ => 1.4,
        }
    }

    pub fn has_avatar(&self) -> bool {
        self.avatar.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Employed => "Employed",
            JobStatus::Unemployed => "Available",
            JobStatus::Student => "Student",
        }
    }
}
