use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::identity::UserProfile;
use crate::store::FieldPredicate;

/// A user's daily replay entitlement.
///
/// At most one credit is consumed per UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayCredit {
    pub last_replay_date: Option<NaiveDate>,
}

impl ReplayCredit {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            last_replay_date: profile.last_replay_date,
        }
    }

    /// True iff no credit was consumed yet, or the last one strictly before `today`.
    pub fn is_available(&self, today: NaiveDate) -> bool {
        self.last_replay_date.map_or(true, |last| last < today)
    }

    /// Store-side form of [`is_available`](Self::is_available), for the
    /// conditional write that consumes the credit.
    pub fn available_predicate(today: NaiveDate) -> Result<FieldPredicate, StoreError> {
        let today = serde_json::to_value(today)?;
        Ok(FieldPredicate::AnyOf(vec![
            FieldPredicate::absent(UserProfile::LAST_REPLAY_DATE),
            FieldPredicate::less_than(UserProfile::LAST_REPLAY_DATE, today),
        ]))
    }

    /// Fields recording a credit consumed on `today`.
    pub fn consumed_fields(today: NaiveDate) -> Result<Map<String, Value>, StoreError> {
        let mut fields = Map::new();
        fields.insert(
            UserProfile::LAST_REPLAY_DATE.to_string(),
            serde_json::to_value(today)?,
        );
        Ok(fields)
    }
}
