use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;

/// A transaction as it appears in a provider page, normalised across
/// providers. Only used on the way in; what we keep is [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTransaction {
    pub id: Id,
    pub account_id: Id,
    /// Minor currency units, negative for spend.
    pub amount: i64,
    /// ISO-8601 timestamp exactly as the provider sent it.
    pub created: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl PageTransaction {
    /// Keep only what the aggregates need.
    pub fn accept(&self) -> Transaction {
        Transaction {
            account_id: self.account_id.clone(),
            amount: self.amount,
            created: self.created.clone(),
            id: self.id.clone(),
        }
    }
}

/// An accepted transit transaction. Immutable once accepted; identity is
/// `id`.
///
/// The serialized field names match the persisted `travelTransactions`
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub account_id: Id,
    /// Minor currency units, negative for spend.
    pub amount: i64,
    pub created: String,
    pub id: Id,
}

impl Transaction {
    pub fn new(
        id: impl Into<Id>,
        account_id: impl Into<Id>,
        amount: i64,
        created: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            amount,
            created: created.into(),
            id: id.into(),
        }
    }

    /// `YYYY` taken straight from the `created` string.
    pub fn year(&self) -> Option<&str> {
        self.created.get(0..4)
    }

    /// `MM` taken straight from the `created` string.
    pub fn month(&self) -> Option<&str> {
        self.created.get(5..7)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn year_and_month_come_from_the_string() {
        let tx = Transaction::new("tx_1", "acc_1", -280, "2023-07-14T08:01:02.123Z");
        assert_eq!(tx.year(), Some("2023"));
        assert_eq!(tx.month(), Some("07"));
    }

    #[test]
    fn short_created_strings_do_not_panic() {
        let tx = Transaction::new("tx_1", "acc_1", -280, "20");
        assert_eq!(tx.year(), None);
        assert_eq!(tx.month(), None);
        assert_eq!(tx.created_at(), None);
    }

    #[test]
    fn created_at_normalises_offsets() {
        let tx = Transaction::new("tx_1", "acc_1", -280, "2023-07-01T01:00:00+01:00");
        assert_eq!(
            tx.created_at(),
            Some(Utc.with_ymd_and_hms(2023, 7, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn persisted_shape_matches_snapshot_keys() {
        let tx = Transaction::new("tx_1", "acc_1", -280, "2023-07-01T00:00:00Z");
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "account_id": "acc_1",
                "amount": -280,
                "created": "2023-07-01T00:00:00Z",
                "id": "tx_1"
            })
        );
    }

    #[test]
    fn accept_drops_category_and_description() {
        let page = PageTransaction {
            id: Id::from("tx_1"),
            account_id: Id::from("acc_1"),
            amount: -150,
            created: "2023-07-01T00:00:00Z".to_string(),
            category: "transport".to_string(),
            description: "TFL.GOV.UK/CP".to_string(),
        };
        assert_eq!(
            page.accept(),
            Transaction::new("tx_1", "acc_1", -150, "2023-07-01T00:00:00Z")
        );
    }
}
