//! Per-section block builders.
//!
//! Pure functions of the snapshot. A section with nothing to show produces no
//! block at all; a blank required field drops the entry instead of failing.

use chrono::NaiveDate;

use crate::blocks::{AvatarBox, Block, BlockId, BlockKind, Document, Paragraph, TextStyle};
use crate::models::resume::{ExperienceType, ResumeData, ResumeType};

const HEADER_MARGIN_BOTTOM_PX: f32 = 12.0;
const SECTION_MARGIN_TOP_PX: f32 = 10.0;
const SECTION_MARGIN_BOTTOM_PX: f32 = 6.0;
const ENTRY_GAP_PX: f32 = 6.0;
const FIELD_SEPARATOR: &str = "  |  ";
const LIST_SEPARATOR: &str = "  ·  ";

/// Renders the snapshot into its ordered block sequence.
///
/// Header first, then education, experience, projects, skills, languages, awards,
/// portfolio, social links and summary, each only when it has content.
pub fn render_blocks(data: &ResumeData) -> Document {
    let sections: [(BlockKind, Vec<Paragraph>); 9] = [
        (BlockKind::Education, education(data)),
        (BlockKind::Experience, experience(data)),
        (BlockKind::Projects, projects(data)),
        (BlockKind::Skills, skills(data)),
        (BlockKind::Languages, languages(data)),
        (BlockKind::Awards, awards(data)),
        (BlockKind::Portfolio, portfolio(data)),
        (BlockKind::SocialLinks, social_links(data)),
        (BlockKind::Summary, summary(data)),
    ];

    let mut blocks = vec![header(data)];
    for (kind, body) in sections {
        if body.is_empty() {
            continue;
        }
        let mut paragraphs = Vec::with_capacity(body.len() + 1);
        paragraphs.push(Paragraph::new(kind.title(), TextStyle::SECTION_TITLE));
        paragraphs.extend(body);
        blocks.push(Block {
            id: BlockId {
                index: blocks.len(),
                kind,
            },
            paragraphs,
            avatar: None,
            margin_top_px: SECTION_MARGIN_TOP_PX,
            margin_bottom_px: SECTION_MARGIN_BOTTOM_PX,
        });
    }

    Document::new(blocks)
}

// ────────────────────────────────────────────────────────────────────────────
// Header
// ────────────────────────────────────────────────────────────────────────────

fn header(data: &ResumeData) -> Block {
    let mut paragraphs = Vec::new();

    if let Some(name) = non_blank(Some(&data.full_name)) {
        paragraphs.push(Paragraph::new(name, TextStyle::NAME));
    }

    let contact = join_present(
        [
            non_blank(Some(&data.phone)),
            non_blank(Some(&data.email)),
            non_blank(data.current_city.as_ref()),
        ],
        FIELD_SEPARATOR,
    );
    if let Some(contact) = contact {
        paragraphs.push(Paragraph::spaced(contact, TextStyle::BODY, 4.0));
    }

    if data.resume_type == ResumeType::Social {
        let years = data.work_years.map(|y| format!("{y} yrs experience"));
        let career = join_present(
            [
                years.as_deref(),
                non_blank(data.current_company.as_ref()),
                non_blank(data.current_position.as_ref()),
            ],
            FIELD_SEPARATOR,
        );
        if let Some(career) = career {
            paragraphs.push(Paragraph::new(career, TextStyle::BODY));
        }
    }

    let positions = non_blank(data.target_positions.as_ref()).map(|p| format!("Target: {p}"));
    let cities = non_blank(data.target_cities.as_ref()).map(|c| format!("Cities: {c}"));
    let salary = non_blank(data.expected_salary.as_ref()).map(|s| format!("Salary: {s}"));
    let intent = join_present(
        [
            positions.as_deref(),
            cities.as_deref(),
            salary.as_deref(),
            data.job_status.as_ref().map(|s| s.label()),
        ],
        FIELD_SEPARATOR,
    );
    if let Some(intent) = intent {
        paragraphs.push(Paragraph::new(intent, TextStyle::BODY));
    }

    Block {
        id: BlockId {
            index: 0,
            kind: BlockKind::Header,
        },
        paragraphs,
        avatar: data
            .has_avatar()
            .then(|| AvatarBox::with_ratio(data.avatar_ratio())),
        margin_top_px: 0.0,
        margin_bottom_px: HEADER_MARGIN_BOTTOM_PX,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

fn education(data: &ResumeData) -> Vec<Paragraph> {
    let mut entries: Vec<_> = data
        .educations
        .iter()
        .filter(|e| !e.school_name.trim().is_empty())
        .collect();
    entries.sort_by_key(|e| e.sort_order);

    let mut out = Vec::new();
    for e in entries {
        let heading = join_present(
            [
                non_blank(Some(&e.school_name)),
                non_blank(Some(&e.degree)),
                non_blank(Some(&e.major)),
                date_range(e.start_date, e.end_date).as_deref(),
            ],
            FIELD_SEPARATOR,
        );
        push_heading(&mut out, heading);
        if let Some(gpa) = non_blank(e.gpa.as_ref()) {
            out.push(Paragraph::new(format!("GPA: {gpa}"), TextStyle::BODY));
        }
        if let Some(courses) = non_blank(e.courses.as_ref()) {
            out.push(Paragraph::new(format!("Courses: {courses}"), TextStyle::BODY));
        }
        if let Some(honors) = non_blank(e.honors.as_ref()) {
            out.push(Paragraph::new(format!("Honors: {honors}"), TextStyle::BODY));
        }
    }
    out
}

fn experience(data: &ResumeData) -> Vec<Paragraph> {
    let mut entries: Vec<_> = data
        .work_experiences
        .iter()
        .filter(|e| !e.company_name.trim().is_empty())
        .collect();
    entries.sort_by_key(|e| e.sort_order);

    let mut out = Vec::new();
    for e in entries {
        let position = match e.exp_type {
            ExperienceType::Internship => non_blank(Some(&e.position)).map(|p| format!("{p} (Intern)")),
            ExperienceType::Work => non_blank(Some(&e.position)).map(str::to_string),
        };
        let heading = join_present(
            [
                non_blank(Some(&e.company_name)),
                position.as_deref(),
                date_range(e.start_date, e.end_date).as_deref(),
            ],
            FIELD_SEPARATOR,
        );
        push_heading(&mut out, heading);
        push_description(&mut out, &e.description);
    }
    out
}

fn projects(data: &ResumeData) -> Vec<Paragraph> {
    let mut entries: Vec<_> = data
        .projects
        .iter()
        .filter(|p| !p.project_name.trim().is_empty())
        .collect();
    entries.sort_by_key(|p| p.sort_order);

    let mut out = Vec::new();
    for p in entries {
        let heading = join_present(
            [
                non_blank(Some(&p.project_name)),
                non_blank(Some(&p.role)),
                date_range(p.start_date, p.end_date).as_deref(),
            ],
            FIELD_SEPARATOR,
        );
        push_heading(&mut out, heading);
        if let Some(link) = non_blank(p.project_link.as_ref()) {
            out.push(Paragraph::new(link, TextStyle::BODY));
        }
        push_description(&mut out, &p.description);
    }
    out
}

fn skills(data: &ResumeData) -> Vec<Paragraph> {
    let mut entries: Vec<_> = data
        .skills
        .iter()
        .filter(|s| !s.skill_name.trim().is_empty())
        .collect();
    entries.sort_by_key(|s| s.sort_order);

    let items: Vec<String> = entries
        .iter()
        .map(|s| match non_blank(Some(&s.proficiency)) {
            Some(level) => format!("{} ({level})", s.skill_name.trim()),
            None => s.skill_name.trim().to_string(),
        })
        .collect();

    if items.is_empty() {
        return Vec::new();
    }
    vec![Paragraph::spaced(items.join(LIST_SEPARATOR), TextStyle::BODY, 4.0)]
}

fn languages(data: &ResumeData) -> Vec<Paragraph> {
    let items: Vec<String> = data
        .languages
        .iter()
        .filter(|l| !l.language.trim().is_empty())
        .map(|l| match non_blank(Some(&l.proficiency)) {
            Some(level) => format!("{}: {level}", l.language.trim()),
            None => l.language.trim().to_string(),
        })
        .collect();

    if items.is_empty() {
        return Vec::new();
    }
    vec![Paragraph::spaced(items.join(LIST_SEPARATOR), TextStyle::BODY, 4.0)]
}

fn awards(data: &ResumeData) -> Vec<Paragraph> {
    let mut entries: Vec<_> = data
        .awards
        .iter()
        .filter(|a| !a.award_name.trim().is_empty())
        .collect();
    entries.sort_by_key(|a| a.sort_order);

    let mut out = Vec::new();
    for a in entries {
        let date = a.award_date.map(fmt_month);
        let heading = join_present(
            [non_blank(Some(&a.award_name)), date.as_deref()],
            FIELD_SEPARATOR,
        );
        push_heading(&mut out, heading);
        if let Some(desc) = a.description.as_deref() {
            push_description(&mut out, desc);
        }
    }
    out
}

fn portfolio(data: &ResumeData) -> Vec<Paragraph> {
    let mut entries: Vec<_> = data
        .portfolios
        .iter()
        .filter(|p| !p.work_name.trim().is_empty())
        .collect();
    entries.sort_by_key(|p| p.sort_order);

    let mut out = Vec::new();
    for p in entries {
        push_heading(&mut out, non_blank(Some(&p.work_name)).map(str::to_string));
        if let Some(link) = non_blank(p.work_link.as_ref()) {
            out.push(Paragraph::new(link, TextStyle::BODY));
        }
        if let Some(attachment) = non_blank(p.attachment_url.as_ref()) {
            out.push(Paragraph::new(
                format!("Attachment: {attachment}"),
                TextStyle::BODY,
            ));
        }
        if let Some(desc) = p.description.as_deref() {
            push_description(&mut out, desc);
        }
    }
    out
}

fn social_links(data: &ResumeData) -> Vec<Paragraph> {
    data.social_links
        .iter()
        .filter(|l| !l.url.trim().is_empty())
        .enumerate()
        .map(|(i, l)| {
            let text = match non_blank(Some(&l.platform)) {
                Some(platform) => format!("{platform}: {}", l.url.trim()),
                None => l.url.trim().to_string(),
            };
            let space = if i == 0 { 4.0 } else { 0.0 };
            Paragraph::spaced(text, TextStyle::BODY, space)
        })
        .collect()
}

fn summary(data: &ResumeData) -> Vec<Paragraph> {
    let mut out = Vec::new();
    if let Some(text) = data.self_evaluation.as_deref() {
        push_description(&mut out, text);
    }
    if let Some(first) = out.first_mut() {
        first.space_before_px = 4.0;
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn push_heading(out: &mut Vec<Paragraph>, heading: Option<String>) {
    if let Some(heading) = heading {
        out.push(Paragraph::spaced(
            heading,
            TextStyle::ENTRY_HEADING,
            ENTRY_GAP_PX,
        ));
    }
}

/// One paragraph per non-blank line of free text.
fn push_description(out: &mut Vec<Paragraph>, text: &str) {
    out.extend(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Paragraph::new(line, TextStyle::BODY)),
    );
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn join_present<'a, const N: usize>(parts: [Option<&'a str>; N], sep: &str) -> Option<String> {
    let present: Vec<&str> = parts.into_iter().flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(sep))
    }
}

fn fmt_month(date: NaiveDate) -> String {
    date.format("%Y.%m").to_string()
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    match (start, end) {
        (Some(s), Some(e)) => Some(format!("{} - {}", fmt_month(s), fmt_month(e))),
        (Some(s), None) => Some(format!("{} - Present", fmt_month(s))),
        (None, Some(e)) => Some(fmt_month(e)),
        (None, None) => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{
        EducationEntry, LanguageEntry, SkillEntry, SocialLinkEntry, WorkExperienceEntry,
    };

    fn date(y: i32, m: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, 1)
    }

    fn make_data() -> ResumeData {
        ResumeData {
            full_name: "Lin Wei".to_string(),
            phone: "13800000000".to_string(),
            email: "lin@example.com".to_string(),
            ..Default::default()
        }
    }

    fn kinds(doc: &Document) -> Vec<BlockKind> {
        doc.blocks().iter().map(|b| b.kind()).collect()
    }

    #[test]
    fn test_empty_snapshot_yields_header_only() {
        let doc = render_blocks(&make_data());
        assert_eq!(kinds(&doc), vec![BlockKind::Header]);
    }

    #[test]
    fn test_sections_follow_canonical_order() {
        let mut data = make_data();
        // Filled in reverse of the canonical order on purpose.
        data.self_evaluation = Some("Curious engineer.".to_string());
        data.social_links.push(SocialLinkEntry {
            platform: "GitHub".to_string(),
            url: "https://github.com/lin".to_string(),
        });
        data.skills.push(SkillEntry {
            skill_name: "Rust".to_string(),
            proficiency: "Proficient".to_string(),
            sort_order: 0,
        });
        data.educations.push(EducationEntry {
            school_name: "Tsinghua".to_string(),
            degree: "BSc".to_string(),
            major: "CS".to_string(),
            start_date: date(2018, 9),
            end_date: date(2022, 6),
            ..Default::default()
        });

        let doc = render_blocks(&data);
        assert_eq!(
            kinds(&doc),
            vec![
                BlockKind::Header,
                BlockKind::Education,
                BlockKind::Skills,
                BlockKind::SocialLinks,
                BlockKind::Summary,
            ]
        );
        for (i, block) in doc.blocks().iter().enumerate() {
            assert_eq!(block.id.index, i, "block identity must follow position");
        }
    }

    #[test]
    fn test_blank_entries_are_omitted_not_rendered_empty() {
        let mut data = make_data();
        data.languages.push(LanguageEntry {
            language: "   ".to_string(),
            proficiency: "Fluent".to_string(),
        });
        data.self_evaluation = Some("\n   \n".to_string());
        let doc = render_blocks(&data);
        assert_eq!(kinds(&doc), vec![BlockKind::Header]);
    }

    #[test]
    fn test_entries_sorted_by_sort_order_stable() {
        let mut data = make_data();
        for (name, order) in [("Beta", 2), ("Alpha", 1), ("Gamma", 2)] {
            data.work_experiences.push(WorkExperienceEntry {
                company_name: name.to_string(),
                position: "Engineer".to_string(),
                sort_order: order,
                ..Default::default()
            });
        }
        let doc = render_blocks(&data);
        let headings: Vec<&str> = doc.blocks()[1]
            .paragraphs
            .iter()
            .filter(|p| p.style == TextStyle::ENTRY_HEADING)
            .map(|p| p.text.as_str())
            .collect();
        assert!(headings[0].starts_with("Alpha"));
        assert!(headings[1].starts_with("Beta"));
        assert!(headings[2].starts_with("Gamma"));
    }

    #[test]
    fn test_description_lines_become_paragraphs() {
        let mut data = make_data();
        data.work_experiences.push(WorkExperienceEntry {
            exp_type: ExperienceType::Internship,
            company_name: "Acme".to_string(),
            position: "Backend".to_string(),
            start_date: date(2023, 7),
            description: "Built the queue.\n\n  Cut p99 by 40%.  ".to_string(),
            ..Default::default()
        });
        let doc = render_blocks(&data);
        let texts: Vec<&str> = doc.blocks()[1]
            .paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(
            texts,
            vec![
                "Experience",
                "Acme  |  Backend (Intern)  |  2023.07 - Present",
                "Built the queue.",
                "Cut p99 by 40%.",
            ]
        );
    }

    #[test]
    fn test_header_reserves_avatar_only_when_present() {
        let mut data = make_data();
        assert!(render_blocks(&data).blocks()[0].avatar.is_none());
        data.avatar = Some("data:image/png;base64,AAAA".to_string());
        data.avatar_ratio = Some("1".to_string());
        let avatar = render_blocks(&data).blocks()[0].avatar.unwrap();
        assert!((avatar.width_px - avatar.height_px).abs() < 1e-4);
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut data = make_data();
        data.self_evaluation = Some("Steady.".to_string());
        let a = render_blocks(&data);
        let b = render_blocks(&data);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_date_range_formats() {
        assert_eq!(
            date_range(date(2020, 9), date(2024, 6)).as_deref(),
            Some("2020.09 - 2024.06")
        );
        assert_eq!(date_range(None, date(2024, 6)).as_deref(), Some("2024.06"));
        assert_eq!(date_range(None, None), None);
    }
}
