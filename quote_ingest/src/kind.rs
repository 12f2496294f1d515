//! Stock/sector classification and the routing it implies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which family of quotes a message carries.
///
/// The kind decides every storage detail: the table probed and written, the
/// code column in that table, and the payload field holding the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    /// Equity quotes, keyed by ticker.
    Stock,
    /// Market sector quotes, keyed by sector code.
    Sector,
}

impl QuoteKind {
    /// Parses the message attribute tag. Case-sensitive, no trimming.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "stock" => Some(Self::Stock),
            "sector" => Some(Self::Sector),
            _ => None,
        }
    }

    /// The tag as it appears in message attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Sector => "sector",
        }
    }

    /// Table holding this kind's rows.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Stock => "weekly_stock_quotes",
            Self::Sector => "weekly_sector_quotes",
        }
    }

    /// Column holding the entity code in [`Self::table_name`].
    pub fn code_column(self) -> &'static str {
        match self {
            Self::Stock => "stock_code",
            Self::Sector => "sector_code",
        }
    }

    /// Field holding the entity code in a raw payload quote.
    pub fn payload_code_field(self) -> &'static str {
        match self {
            Self::Stock => "stock_code",
            Self::Sector => "sector_code",
        }
    }
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
