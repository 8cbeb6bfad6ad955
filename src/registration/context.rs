//! Registration context.
//!
//! Mirrors the JSON document the wizard pages read and write. Field names
//! are camelCase on the wire; sections the engine never inspects keep their
//! extra fields in flattened maps so nothing a page submits is lost.

use super::lenient;
use crate::core::{Model, Patch};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Number of user-visible sections, used for progress display.
pub const TOTAL_STEPS: u32 = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Context {
    pub basic_info: BasicInfo,
    pub household: Household,
    pub impact: Map<String, Value>,
    pub resources: Resources,
    pub submit: Map<String, Value>,
    pub disasters: Disasters,
    pub registration: Registration,
    pub config: Config,
    pub meta: Meta,
    /// `"form"` while any form section is active, empty otherwise.
    pub prefix: String,
    pub current_section: String,
    pub current_step: String,
    pub previous_section: String,
    pub previous_step: String,
    pub step: u32,
    pub total_steps: u32,
    pub errors: Errors,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            basic_info: BasicInfo::default(),
            household: Household::default(),
            impact: Map::new(),
            resources: Resources::default(),
            submit: Map::new(),
            disasters: Disasters::default(),
            registration: Registration::default(),
            config: Config::default(),
            meta: Meta::default(),
            prefix: String::new(),
            current_section: "welcome".to_string(),
            current_step: String::new(),
            previous_section: String::new(),
            previous_step: String::new(),
            step: 0,
            total_steps: TOTAL_STEPS,
            errors: Errors::default(),
        }
    }
}

impl Model for Context {
    fn transient_keys() -> &'static [&'static str] {
        &["currentSection", "currentStep", "errors", "disasters", "meta"]
    }

    /// `config.useLocalStorage` unset or affirmative.
    fn persistence_enabled(&self) -> bool {
        self.config.use_local_storage != Some(false)
    }
}

impl Context {
    /// Fresh context that keeps the runtime config and the disaster catalog.
    pub fn reset(&self) -> Self {
        Self {
            config: self.config.clone(),
            disasters: self.disasters.clone(),
            ..Self::default()
        }
    }

    /// Every top-level field as a patch, for wholesale replacement.
    pub fn to_patch(&self) -> Patch {
        match serde_json::to_value(self) {
            Ok(value) => Patch::from_value(value),
            Err(error) => {
                tracing::warn!(%error, "context could not be encoded");
                Patch::new()
            }
        }
    }

    /// The member whose resources are being collected.
    pub fn resource_member(&self) -> Option<&Member> {
        self.resources
            .current_holder()
            .and_then(|index| self.household.members.get(index))
    }

    /// Apply `f` to the member whose resources are being collected.
    ///
    /// Returns the updated household, unchanged when there is no such member.
    pub fn with_resource_member(&self, f: impl FnOnce(&mut Member)) -> Household {
        let mut household = self.household.clone();
        if let Some(member) = self
            .resources
            .current_holder()
            .and_then(|index| household.members.get_mut(index))
        {
            f(member);
        }
        household
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicInfo {
    /// Whether the residence address is also the mailing address.
    #[serde(deserialize_with = "lenient::flag")]
    pub current_mailing_address: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BasicInfo {
    pub fn needs_mailing_address(&self) -> bool {
        self.current_mailing_address == Some(false)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Household {
    #[serde(deserialize_with = "lenient::count")]
    pub num_members: Option<usize>,
    /// Cursor over `members[1..]`; the applicant is member 0.
    #[serde(deserialize_with = "lenient::index")]
    pub current_member_index: usize,
    pub members: Vec<Member>,
}

impl Household {
    /// Declared household size, or the number of recorded members.
    pub fn count(&self) -> usize {
        self.num_members.unwrap_or(self.members.len())
    }

    /// Whether the member after the cursor still needs details.
    pub fn has_additional_members(&self) -> bool {
        self.current_member_index + 1 < self.count()
    }

    pub fn applicant(&self) -> Option<&Member> {
        self.members.first()
    }

    pub fn with_cursor(&self, index: usize) -> Self {
        Self {
            current_member_index: index,
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Member {
    pub name: Name,
    #[serde(deserialize_with = "lenient::flag")]
    pub has_jobs: Option<bool>,
    #[serde(deserialize_with = "lenient::flag")]
    pub has_other_jobs: Option<bool>,
    pub assets_and_income: AssetsAndIncome,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Member {
    pub fn has_job(&self) -> bool {
        self.has_jobs == Some(true)
    }

    pub fn has_other_jobs(&self) -> bool {
        self.has_other_jobs == Some(true)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Name {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

impl Name {
    /// Non-empty name parts joined by spaces.
    pub fn full(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetsAndIncome {
    #[serde(deserialize_with = "lenient::flag")]
    pub has_income: Option<bool>,
    /// Cursor over `jobs`.
    #[serde(deserialize_with = "lenient::index")]
    pub current_job_index: usize,
    pub jobs: Vec<Job>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Job {
    pub employer_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub pay: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_dsnap_agency: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Resources {
    /// Household member indices that reported income, in visiting order.
    pub members_with_income: Vec<usize>,
    /// Cursor over `members_with_income`.
    #[serde(deserialize_with = "lenient::index")]
    pub current_member_index: usize,
}

impl Resources {
    /// Household index of the member the cursor points at.
    pub fn current_holder(&self) -> Option<usize> {
        self.members_with_income
            .get(self.current_member_index)
            .copied()
    }

    pub fn has_pending_members(&self) -> bool {
        self.current_member_index < self.members_with_income.len()
    }

    /// Cursor one member back, clamped into range.
    ///
    /// A cursor already past the end (every member visited) steps back to
    /// the last member rather than to a position that does not exist.
    pub fn previous_member_index(&self) -> usize {
        self.current_member_index
            .min(self.members_with_income.len())
            .saturating_sub(1)
    }

    pub fn with_cursor(&self, index: usize) -> Self {
        Self {
            current_member_index: index,
            ..self.clone()
        }
    }
}

/// Disaster catalog keyed by disaster id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disasters {
    pub data: BTreeMap<String, Disaster>,
}

impl Disasters {
    pub fn from_list(disasters: Vec<Disaster>) -> Self {
        Self {
            data: disasters
                .into_iter()
                .map(|disaster| (disaster.id.clone(), disaster))
                .collect(),
        }
    }

    /// Decode a catalog list as returned by the disaster service.
    pub fn from_value(value: &Value) -> Self {
        match Vec::<Disaster>::deserialize(value) {
            Ok(list) => Self::from_list(list),
            Err(error) => {
                tracing::warn!(%error, "unexpected disaster catalog shape");
                Self::default()
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disaster {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    pub title: String,
    pub disaster_request_no: String,
    pub state: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Registration {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub eligible: Option<bool>,
    pub applicant_name: String,
}

impl Registration {
    pub fn is_eligible(&self) -> bool {
        self.eligible == Some(true)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Durable storage switch; unset means enabled.
    #[serde(deserialize_with = "lenient::flag")]
    pub use_local_storage: Option<bool>,
    pub language: String,
    pub disaster: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_local_storage: None,
            language: "en".to_string(),
            disaster: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub loading: Option<bool>,
}

/// Error flags surfaced to the pages.
///
/// A fresh wizard stores this as an empty string, so anything that is not an
/// object decodes to "no errors".
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Errors {
    pub server: bool,
}

impl<'de> Deserialize<'de> for Errors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self {
            server: value
                .get("server")
                .and_then(lenient::parse_flag)
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(first: &str, has_jobs: bool) -> Member {
        Member {
            name: Name {
                first_name: first.into(),
                ..Name::default()
            },
            has_jobs: Some(has_jobs),
            ..Member::default()
        }
    }

    #[test]
    fn default_matches_fresh_wizard() {
        let context = Context::default();

        assert_eq!(context.current_section, "welcome");
        assert_eq!(context.total_steps, 6);
        assert_eq!(context.config.language, "en");
        assert!(context.persistence_enabled());
    }

    #[test]
    fn decodes_form_shaped_document() {
        let context: Context = serde_json::from_value(json!({
            "basicInfo": { "currentMailingAddress": "false", "phone": "2165555555" },
            "household": {
                "numMembers": "2",
                "members": [{
                    "name": { "firstName": "Adam", "lastName": "B" },
                    "hasJobs": true,
                    "hasOtherJobs": "no",
                    "sex": "male",
                    "assetsAndIncome": {
                        "hasIncome": true,
                        "jobs": [{ "employerName": "TTS", "pay": "1000", "isDsnapAgency": "no" }]
                    }
                }]
            },
            "config": { "useLocalStorage": "no" },
            "errors": ""
        }))
        .unwrap();

        assert!(context.basic_info.needs_mailing_address());
        assert_eq!(context.basic_info.extra["phone"], json!("2165555555"));
        assert_eq!(context.household.count(), 2);
        let applicant = context.household.applicant().unwrap();
        assert!(applicant.has_job());
        assert!(!applicant.has_other_jobs());
        assert_eq!(applicant.extra["sex"], json!("male"));
        assert_eq!(applicant.assets_and_income.jobs[0].is_dsnap_agency, Some(false));
        assert!(!context.persistence_enabled());
    }

    #[test]
    fn household_loop_covers_members_after_applicant() {
        let household = Household {
            num_members: Some(3),
            ..Household::default()
        };

        assert!(household.with_cursor(0).has_additional_members());
        assert!(household.with_cursor(1).has_additional_members());
        assert!(!household.with_cursor(2).has_additional_members());
        assert_eq!(Household::default().count(), 0);
    }

    #[test]
    fn resources_cursor_stays_in_range() {
        let resources = Resources {
            members_with_income: vec![0, 2],
            current_member_index: 0,
        };

        assert_eq!(resources.current_holder(), Some(0));
        assert_eq!(resources.with_cursor(1).current_holder(), Some(2));
        assert!(resources.with_cursor(1).has_pending_members());
        assert!(!resources.with_cursor(2).has_pending_members());
        assert_eq!(resources.previous_member_index(), 0);
        assert_eq!(resources.with_cursor(1).previous_member_index(), 0);
        assert_eq!(resources.with_cursor(5).previous_member_index(), 1);
    }

    #[test]
    fn resource_member_follows_cursor() {
        let context = Context {
            household: Household {
                members: vec![member("Adam", true), member("Bob", false)],
                ..Household::default()
            },
            resources: Resources {
                members_with_income: vec![1],
                current_member_index: 0,
            },
            ..Context::default()
        };

        assert_eq!(context.resource_member().unwrap().name.first_name, "Bob");

        let household = context.with_resource_member(|m| m.has_other_jobs = Some(true));
        assert_eq!(household.members[1].has_other_jobs, Some(true));
        assert_eq!(household.members[0].has_other_jobs, None);
    }

    #[test]
    fn reset_keeps_config_and_catalog() {
        let mut context = Context::default();
        context.config.use_local_storage = Some(false);
        context.disasters = Disasters::from_value(&json!([{ "id": 11, "title": "Matthew" }]));
        context.household.num_members = Some(4);
        context.current_section = "household".into();

        let fresh = context.reset();

        assert_eq!(fresh.config, context.config);
        assert_eq!(fresh.disasters.data["11"].title, "Matthew");
        assert_eq!(fresh.household, Household::default());
        assert_eq!(fresh.current_section, "welcome");
    }

    #[test]
    fn full_name_skips_blank_parts() {
        let name = Name {
            first_name: "Adam".into(),
            middle_name: " ".into(),
            last_name: "B".into(),
        };

        assert_eq!(name.full(), "Adam B");
    }

    #[test]
    fn patch_covers_every_field() {
        let patch = Context::default().to_patch();

        assert_eq!(patch.len(), 17);
        assert_eq!(patch.get("currentSection"), Some(&json!("welcome")));
    }
}
