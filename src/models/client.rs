use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored client record as it travels over the wire.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub cpf: String,
    pub income: f64,
    pub birth_date: Option<DateTime<Utc>>,
    pub children: i32,
}

/// Validated field values for a client that does not have an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub cpf: String,
    pub income: f64,
    pub birth_date: Option<DateTime<Utc>>,
    pub children: i32,
}

impl NewClient {
    pub fn with_id(self, id: i64) -> Client {
        Client {
            id,
            name: self.name,
            cpf: self.cpf,
            income: self.income,
            birth_date: self.birth_date,
            children: self.children,
        }
    }
}

/// Request body for create and update.
///
/// Mutable fields are double options: the outer `None` means the field was
/// absent from the body, `Some(None)` means it was an explicit `null`. Absent
/// fields keep their stored value on update; `null` clears `birthDate` and is
/// rejected for every other field.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "explicit")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub cpf: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub income: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit")]
    pub birth_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit")]
    pub children: Option<Option<i32>>,
}

/// Only called for keys present in the body, so a `null` lands as `Some(None)`.
fn explicit<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A single rejected field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_name: String,
    pub message: String,
}

impl FieldError {
    fn new(field_name: &str, message: &str) -> Self {
        Self {
            field_name: field_name.to_string(),
            message: message.to_string(),
        }
    }
}

impl ClientPayload {
    /// Validate the payload for insertion. `name`, `cpf` and `income` are
    /// required, `children` defaults to zero. Any body `id` is ignored.
    pub fn into_new_client(self, now: DateTime<Utc>) -> Result<NewClient, Vec<FieldError>> {
        let mut errors = Vec::new();
        self.check(&mut errors, now, true);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewClient {
            name: trimmed(self.name.flatten()).unwrap_or_default(),
            cpf: trimmed(self.cpf.flatten()).unwrap_or_default(),
            income: self.income.flatten().unwrap_or_default(),
            birth_date: self.birth_date.flatten(),
            children: self.children.flatten().unwrap_or(0),
        })
    }

    /// Merge the fields present in the payload over `current`. The stored id
    /// always wins over whatever the body carries.
    pub fn apply_to(self, current: &Client, now: DateTime<Utc>) -> Result<Client, Vec<FieldError>> {
        let mut errors = Vec::new();
        self.check(&mut errors, now, false);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Client {
            id: current.id,
            name: trimmed(self.name.flatten()).unwrap_or_else(|| current.name.clone()),
            cpf: trimmed(self.cpf.flatten()).unwrap_or_else(|| current.cpf.clone()),
            income: self.income.flatten().unwrap_or(current.income),
            birth_date: match self.birth_date {
                None => current.birth_date,
                Some(birth_date) => birth_date,
            },
            children: self.children.flatten().unwrap_or(current.children),
        })
    }

    /// Field rules, reported in field order. `required` marks absent
    /// `name`, `cpf` and `income` as errors.
    fn check(&self, errors: &mut Vec<FieldError>, now: DateTime<Utc>, required: bool) {
        check_text(errors, "name", self.name.as_ref(), required);
        check_text(errors, "cpf", self.cpf.as_ref(), required);

        match self.income {
            None if required => errors.push(FieldError::new("income", "Field is required")),
            Some(None) => errors.push(FieldError::new("income", "Income cannot be null")),
            Some(Some(income)) if !income.is_finite() => {
                errors.push(FieldError::new("income", "Income must be a finite number"))
            }
            _ => {}
        }
        if let Some(Some(birth_date)) = self.birth_date {
            if birth_date > now {
                errors.push(FieldError::new("birthDate", "Birth date cannot be in the future"));
            }
        }
        match self.children {
            Some(None) => errors.push(FieldError::new("children", "Children cannot be null")),
            Some(Some(children)) if children < 0 => {
                errors.push(FieldError::new("children", "Children cannot be negative"))
            }
            _ => {}
        }
    }
}

fn check_text(errors: &mut Vec<FieldError>, field: &str, value: Option<&Option<String>>, required: bool) {
    match value {
        None if required => errors.push(FieldError::new(field, "Field is required")),
        Some(None) => errors.push(FieldError::new(field, "Field cannot be null")),
        Some(Some(text)) if text.trim().is_empty() => {
            errors.push(FieldError::new(field, "Field cannot be blank"))
        }
        _ => {}
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn stored() -> Client {
        Client {
            id: 3,
            name: "Clarice Lispector".to_string(),
            cpf: "10919444522".to_string(),
            income: 3800.0,
            birth_date: Some(Utc.with_ymd_and_hms(1960, 4, 13, 7, 50, 0).unwrap()),
            children: 2,
        }
    }

    fn payload(body: serde_json::Value) -> ClientPayload {
        serde_json::from_value(body).unwrap()
    }

    fn field_names(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field_name.as_str()).collect()
    }

    #[test]
    fn absent_and_null_fields_decode_differently() {
        let decoded = payload(json!({ "name": "A", "birthDate": null }));
        assert_eq!(decoded.name, Some(Some("A".to_string())));
        assert_eq!(decoded.birth_date, Some(None));
        assert_eq!(decoded.cpf, None);
        assert_eq!(decoded.children, None);
    }

    #[test]
    fn create_requires_name_cpf_and_income() {
        let errors = ClientPayload::default().into_new_client(now()).unwrap_err();
        assert_eq!(field_names(&errors), vec!["name", "cpf", "income"]);
    }

    #[test]
    fn create_rejects_blank_name() {
        let errors = payload(json!({ "name": "   ", "cpf": "10419244771", "income": 100.0 }))
            .into_new_client(now())
            .unwrap_err();
        assert_eq!(field_names(&errors), vec!["name"]);
    }

    #[test]
    fn create_rejects_null_required_fields() {
        let errors = payload(json!({ "name": null, "cpf": "1", "income": null, "children": null }))
            .into_new_client(now())
            .unwrap_err();
        assert_eq!(field_names(&errors), vec!["name", "income", "children"]);
    }

    #[test]
    fn create_defaults_children_and_ignores_id() {
        let client = payload(json!({
            "id": 99,
            "name": "Lucas Ilussencio",
            "cpf": "10419244771",
            "income": 7500.0,
            "birthDate": null
        }))
        .into_new_client(now())
        .unwrap()
        .with_id(13);
        assert_eq!(client.id, 13);
        assert_eq!(client.children, 0);
        assert_eq!(client.birth_date, None);
    }

    #[test]
    fn future_birth_date_and_negative_children_are_rejected() {
        let errors = payload(json!({
            "name": "A",
            "cpf": "1",
            "income": 1.0,
            "children": -1,
            "birthDate": "2030-01-01T00:00:00Z"
        }))
        .into_new_client(now())
        .unwrap_err();
        assert_eq!(field_names(&errors), vec!["birthDate", "children"]);
    }

    #[test]
    fn partial_update_keeps_absent_fields_and_id() {
        let updated = payload(json!({ "id": 100, "name": "Lucas Ilussencio", "income": 7500.0 }))
            .apply_to(&stored(), now())
            .unwrap();
        assert_eq!(updated.id, 3);
        assert_eq!(updated.name, "Lucas Ilussencio");
        assert_eq!(updated.cpf, "10919444522");
        assert_eq!(updated.income, 7500.0);
        assert_eq!(updated.children, 2);
        assert_eq!(updated.birth_date, stored().birth_date);
    }

    #[test]
    fn explicit_null_clears_birth_date() {
        let updated = payload(json!({ "name": "Clarice Lispector", "birthDate": null }))
            .apply_to(&stored(), now())
            .unwrap();
        assert_eq!(updated.birth_date, None);
        assert_eq!(updated.children, 2);
    }

    #[test]
    fn update_rejects_null_for_required_fields() {
        let errors = payload(json!({ "name": null, "cpf": null, "income": null, "children": null }))
            .apply_to(&stored(), now())
            .unwrap_err();
        assert_eq!(field_names(&errors), vec!["name", "cpf", "income", "children"]);
    }

    #[test]
    fn update_rejects_blank_cpf() {
        let errors = payload(json!({ "cpf": "" }))
            .apply_to(&stored(), now())
            .unwrap_err();
        assert_eq!(field_names(&errors), vec!["cpf"]);
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let value = serde_json::to_value(stored()).unwrap();
        assert_eq!(value["birthDate"], "1960-04-13T07:50:00Z");
        assert_eq!(value["children"], 2);

        let decoded: Client = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, stored());
    }
}
