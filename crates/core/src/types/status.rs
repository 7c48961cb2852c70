//! Status enums for payments and audit entries.
//!
//! The SPA sends payment method and status as free text (sometimes in
//! Russian, sometimes capitalized). The `normalize` constructors map that
//! text onto a closed set before it reaches the `payments` table.

use serde::{Deserialize, Serialize};

/// Normalized payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank card at checkout or on delivery.
    Card,
    /// Cash on delivery.
    Cash,
    /// Online transfer (SBP, wallets).
    Online,
    /// Anything we could not classify.
    #[default]
    Unknown,
}

impl PaymentMethod {
    /// Map free-text input onto a payment method.
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "card" | "карта" | "картой" | "банковская карта" => Self::Card,
            "cash" | "наличные" | "наличными" => Self::Cash,
            "online" | "sbp" | "сбп" | "онлайн" => Self::Online,
            _ => Self::Unknown,
        }
    }

    /// The value stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
            Self::Online => "online",
            Self::Unknown => "unknown",
        }
    }
}

/// Normalized payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Map free-text input onto a payment status. Unknown text is `Pending`.
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "paid" | "success" | "succeeded" | "оплачен" | "оплачено" => Self::Paid,
            "failed" | "error" | "declined" | "ошибка" => Self::Failed,
            "refunded" | "refund" | "возврат" => Self::Refunded,
            _ => Self::Pending,
        }
    }

    /// The value stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Coarse audit-log priority, chosen by the calling route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditSeverity {
    #[default]
    Low,
    Medium,
    High,
}

impl AuditSeverity {
    /// The value stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::str::FromStr for AuditSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(format!("invalid audit severity: {s}")),
        }
    }
}

macro_rules! impl_text_column {
    ($ty:ty, $parse:expr) => {
        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                let parse: fn(&str) -> Result<Self, String> = $parse;
                Ok(parse(s)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

impl_text_column!(PaymentMethod, |s| Ok(PaymentMethod::normalize(s)));
impl_text_column!(PaymentStatus, |s| Ok(PaymentStatus::normalize(s)));
impl_text_column!(AuditSeverity, |s| s.parse());

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_normalization() {
        assert_eq!(PaymentMethod::normalize("card"), PaymentMethod::Card);
        assert_eq!(PaymentMethod::normalize("  Карта "), PaymentMethod::Card);
        assert_eq!(PaymentMethod::normalize("НАЛИЧНЫЕ"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::normalize("sbp"), PaymentMethod::Online);
        assert_eq!(PaymentMethod::normalize("barter"), PaymentMethod::Unknown);
    }

    #[test]
    fn test_payment_status_defaults_to_pending() {
        assert_eq!(PaymentStatus::normalize("Paid"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::normalize("возврат"), PaymentStatus::Refunded);
        assert_eq!(PaymentStatus::normalize(""), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::normalize("whatever"), PaymentStatus::Pending);
    }

    #[test]
    fn test_severity_text_round_trip() {
        for severity in [AuditSeverity::Low, AuditSeverity::Medium, AuditSeverity::High] {
            assert_eq!(severity.as_str().parse::<AuditSeverity>().unwrap(), severity);
        }
        assert!("low".parse::<AuditSeverity>().is_err());
    }

    #[test]
    fn test_severity_serde() {
        assert_eq!(
            serde_json::to_string(&AuditSeverity::Medium).unwrap(),
            "\"MEDIUM\""
        );
    }
}
