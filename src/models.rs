use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
    Frustrated,
    Tired,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Happy,
        Mood::Neutral,
        Mood::Sad,
        Mood::Frustrated,
        Mood::Tired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Frustrated => "frustrated",
            Self::Tired => "tired",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Happy => "Happy",
            Self::Neutral => "Neutral",
            Self::Sad => "Sad",
            Self::Frustrated => "Frustrated",
            Self::Tired => "Tired",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Neutral => "😐",
            Self::Sad => "😔",
            Self::Frustrated => "😤",
            Self::Tired => "😴",
        }
    }

    pub fn parse(s: &str) -> Option<Mood> {
        let s = s.trim().to_lowercase();
        Mood::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: String,
    pub birthday: NaiveDate,
    pub hiring_date: NaiveDate,
    pub location: String,
}

impl Member {
    pub fn apply(&mut self, patch: &MemberPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(role) = &patch.role {
            self.role = role.clone();
        }
        if let Some(birthday) = patch.birthday {
            self.birthday = birthday;
        }
        if let Some(hiring_date) = patch.hiring_date {
            self.hiring_date = hiring_date;
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
    }
}

/// Create payload for a member; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub role: String,
    pub birthday: NaiveDate,
    pub hiring_date: NaiveDate,
    pub location: String,
}

/// Partial update for a member. `None` fields are absent from the PATCH
/// body and left untouched; `Some` fields are sent, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hiring_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl MemberPatch {
    /// The edit form always replaces all five mutable fields.
    pub fn replace_all(draft: &MemberDraft) -> Self {
        Self {
            name: Some(draft.name.clone()),
            role: Some(draft.role.clone()),
            birthday: Some(draft.birthday),
            hiring_date: Some(draft.hiring_date),
            location: Some(draft.location.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.birthday.is_none()
            && self.hiring_date.is_none()
            && self.location.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub description: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    /// References a member id by convention only; the backend does not
    /// enforce it, so notes can outlive their member.
    #[serde(rename = "userId")]
    pub member_id: String,
    pub date: NaiveDate,
    pub talking_points: String,
    pub mood: Mood,
    pub flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_items: Vec<ActionItem>,
}

impl Note {
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(talking_points) = &patch.talking_points {
            self.talking_points = talking_points.clone();
        }
        if let Some(mood) = patch.mood {
            self.mood = mood;
        }
        if let Some(flag) = patch.flag {
            self.flag = flag;
        }
        if let Some(flag_description) = &patch.flag_description {
            self.flag_description = Some(flag_description.clone());
        }
        if let Some(action_items) = &patch.action_items {
            self.action_items = action_items.clone();
        }
    }
}

/// Create payload for a note; the backend assigns id and createdAt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    #[serde(rename = "userId")]
    pub member_id: String,
    pub date: NaiveDate,
    pub talking_points: String,
    pub mood: Mood,
    pub flag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_items: Vec<ActionItem>,
}

/// Partial update for a note. As with [`MemberPatch`], absent and
/// explicitly-cleared fields are distinct: `flag_description: Some("".into())`
/// clears the reason, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talking_points: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<ActionItem>>,
}

impl NotePatch {
    /// The restricted update behind "mark as resolved": drop the flag and
    /// clear its reason, touching nothing else.
    pub fn resolve_flag() -> Self {
        Self {
            flag: Some(false),
            flag_description: Some(String::new()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.talking_points.is_none()
            && self.mood.is_none()
            && self.flag.is_none()
            && self.flag_description.is_none()
            && self.action_items.is_none()
    }
}

/// Derived per-member digest of a note collection. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesSummary {
    pub total_notes: usize,
    pub flagged_notes: usize,
    pub last_note_mood: Option<Mood>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_member() -> Member {
        Member {
            id: "m1".to_string(),
            name: "John Doe".to_string(),
            role: "Senior Frontend Engineer".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            hiring_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            location: "New York, NY".to_string(),
        }
    }

    fn sample_note() -> Note {
        Note {
            id: "n1".to_string(),
            member_id: "m1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            talking_points: "Discussed project progress.".to_string(),
            mood: Mood::Happy,
            flag: true,
            flag_description: Some("Workload concerns".to_string()),
            created_at: "2024-01-15T10:00:00Z".parse().unwrap(),
            action_items: vec![ActionItem {
                description: "Follow up on staffing".to_string(),
                done: false,
                due_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            }],
        }
    }

    #[test]
    fn mood_parse_accepts_wire_names_case_insensitively() {
        assert_eq!(Mood::parse("happy"), Some(Mood::Happy));
        assert_eq!(Mood::parse("  Frustrated "), Some(Mood::Frustrated));
        assert_eq!(Mood::parse("grumpy"), None);
    }

    #[test]
    fn member_wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_member()).unwrap();
        assert_eq!(json["hiringDate"], "2020-01-01");
        assert_eq!(json["birthday"], "1990-01-01");
        assert!(json.get("hiring_date").is_none());
    }

    #[test]
    fn note_wire_shape_uses_user_id_and_camel_case() {
        let json = serde_json::to_value(sample_note()).unwrap();
        assert_eq!(json["userId"], "m1");
        assert_eq!(json["talkingPoints"], "Discussed project progress.");
        assert_eq!(json["mood"], "happy");
        assert_eq!(json["actionItems"][0]["dueDate"], "2024-02-01");
        assert!(json.get("memberId").is_none());
    }

    #[test]
    fn patch_body_carries_only_set_fields() {
        let patch = NotePatch {
            mood: Some(Mood::Tired),
            ..NotePatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["mood"], "tired");
    }

    #[test]
    fn cleared_flag_description_is_sent_as_empty_string() {
        let json = serde_json::to_value(NotePatch::resolve_flag()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["flag"], false);
        assert_eq!(object["flagDescription"], "");
    }

    #[test]
    fn apply_overwrites_set_fields_and_keeps_the_rest() {
        let mut note = sample_note();
        let before = note.clone();
        note.apply(&NotePatch::resolve_flag());

        assert!(!note.flag);
        assert_eq!(note.flag_description.as_deref(), Some(""));
        assert_eq!(note.date, before.date);
        assert_eq!(note.talking_points, before.talking_points);
        assert_eq!(note.mood, before.mood);
        assert_eq!(note.action_items, before.action_items);
    }

    #[test]
    fn apply_is_idempotent() {
        let mut once = sample_member();
        let patch = MemberPatch {
            role: Some("Staff Engineer".to_string()),
            ..MemberPatch::default()
        };
        once.apply(&patch);
        let mut twice = once.clone();
        twice.apply(&patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn note_deserializes_without_optional_fields() {
        let note: Note = serde_json::from_value(serde_json::json!({
            "id": "n9",
            "userId": "m1",
            "date": "2024-03-01",
            "talkingPoints": "Quick sync.",
            "mood": "neutral",
            "flag": false,
            "createdAt": "2024-03-01T09:30:00Z"
        }))
        .unwrap();
        assert_eq!(note.flag_description, None);
        assert!(note.action_items.is_empty());
    }
}
