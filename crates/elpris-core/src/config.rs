use serde::{Deserialize, Serialize};

/// Default host of the spot price API.
pub const DEFAULT_PRICE_HOST: &str = "www.elprisenligenu.dk";

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    #[serde(default)]
    pub prices: PriceConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct PriceConfig<'a> {
    pub host: &'a str,
    pub region: Region,
}

impl Default for PriceConfig<'_> {
    fn default() -> Self {
        Self {
            host: DEFAULT_PRICE_HOST,
            region: Region::Dk1,
        }
    }
}

/// Nord Pool bidding zone the prices are published for
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// West of the Great Belt
    #[default]
    Dk1,
    /// East of the Great Belt
    Dk2,
}

impl Region {
    /// Region code as used in the request path
    pub const fn code(self) -> &'static str {
        match self {
            Self::Dk1 => "DK1",
            Self::Dk2 => "DK2",
        }
    }
}
