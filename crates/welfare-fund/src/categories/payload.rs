use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ClaimKind;
use crate::money::Amount;

/// Category-specific claim details. The review core only looks inside to extract the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimPayload {
    Outpatient(OutpatientClaim),
    Inpatient(InpatientClaim),
    Bereavement(BereavementClaim),
    Disaster(DisasterClaim),
    Emergency(EmergencyClaim),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutpatientClaim {
    pub clinic_name: String,
    pub visit_date: NaiveDate,
    pub total_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InpatientClaim {
    pub hospital_name: String,
    pub admitted_on: NaiveDate,
    pub discharged_on: Option<NaiveDate>,
    pub ward_charges: Amount,
    pub treatment_charges: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Parent,
    Guardian,
    Sibling,
    Spouse,
    Child,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BereavementClaim {
    pub deceased_name: String,
    pub relationship: Relationship,
    pub date_of_death: NaiveDate,
    pub funeral_costs: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasterClaim {
    pub disaster_type: String,
    pub occurred_on: NaiveDate,
    pub location: String,
    pub estimated_loss: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyClaim {
    pub description: String,
    pub amount: Amount,
}

impl ClaimPayload {
    pub fn kind(&self) -> ClaimKind {
        match self {
            ClaimPayload::Outpatient(_) => ClaimKind::Outpatient,
            ClaimPayload::Inpatient(_) => ClaimKind::Inpatient,
            ClaimPayload::Bereavement(_) => ClaimKind::Bereavement,
            ClaimPayload::Disaster(_) => ClaimKind::Disaster,
            ClaimPayload::Emergency(_) => ClaimKind::Emergency,
        }
    }

    /// Amount the student is asking for, derived from the claim details.
    ///
    /// Returns `None` only if the component charges cannot be summed.
    pub fn requested_amount(&self) -> Option<Amount> {
        match self {
            ClaimPayload::Outpatient(claim) => Some(claim.total_amount),
            ClaimPayload::Inpatient(claim) => {
                claim.ward_charges.checked_add(claim.treatment_charges)
            }
            ClaimPayload::Bereavement(claim) => Some(claim.funeral_costs),
            ClaimPayload::Disaster(claim) => Some(claim.estimated_loss),
            ClaimPayload::Emergency(claim) => Some(claim.amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn inpatient_amount_sums_charges() {
        let payload = ClaimPayload::Inpatient(InpatientClaim {
            hospital_name: "Hospital Sultanah Aminah".to_string(),
            admitted_on: date(2026, 3, 2),
            discharged_on: Some(date(2026, 3, 5)),
            ward_charges: "120.50".parse().expect("amount"),
            treatment_charges: "45.25".parse().expect("amount"),
        });

        assert_eq!(payload.kind(), ClaimKind::Inpatient);
        assert_eq!(
            payload.requested_amount(),
            Some(Amount::from_sen(16_575))
        );
    }

    #[test]
    fn payload_uses_kind_tag_on_the_wire() {
        let payload = ClaimPayload::Outpatient(OutpatientClaim {
            clinic_name: "Campus Health Centre".to_string(),
            visit_date: date(2026, 2, 10),
            total_amount: "30".parse().expect("amount"),
        });

        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["kind"], "outpatient");
        assert_eq!(value["total_amount"], "30.00");

        let back: ClaimPayload = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, payload);
    }
}
