//! Fixed watch-list of supported coins.
//!
//! Every coin is declared once in the table below; the enum, its CoinGecko
//! identifier, ticker symbol and display name are all generated from it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! coin_table {
    ($( $variant:ident => ($id:literal, $symbol:literal, $name:literal) ),+ $(,)?) => {
        /// A coin from the fixed watch-list
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Coin {
            $(
                #[doc = $name]
                $variant,
            )+
        }

        impl Coin {
            /// Every supported coin, in menu order
            pub const ALL: &'static [Coin] = &[$(Coin::$variant),+];

            /// CoinGecko identifier (`bitcoin`, `avalanche-2`, ...)
            #[must_use]
            pub const fn id(self) -> &'static str {
                match self {
                    $(Coin::$variant => $id,)+
                }
            }

            /// Ticker symbol
            #[must_use]
            pub const fn symbol(self) -> &'static str {
                match self {
                    $(Coin::$variant => $symbol,)+
                }
            }

            /// Name shown in menus and messages
            #[must_use]
            pub const fn display_name(self) -> &'static str {
                match self {
                    $(Coin::$variant => $name,)+
                }
            }
        }
    };
}

coin_table! {
    Bitcoin => ("bitcoin", "BTC", "Bitcoin"),
    Ethereum => ("ethereum", "ETH", "Ethereum"),
    Tether => ("tether", "USDT", "Tether"),
    BinanceCoin => ("binancecoin", "BNB", "Binancecoin"),
    Solana => ("solana", "SOL", "Solana"),
    Ripple => ("ripple", "XRP", "Ripple"),
    Cardano => ("cardano", "ADA", "Cardano"),
    Dogecoin => ("dogecoin", "DOGE", "Dogecoin"),
    Tron => ("tron", "TRX", "Tron"),
    Avalanche => ("avalanche-2", "AVAX", "Avalanche-2"),
    ShibaInu => ("shiba-inu", "SHIB", "Shiba-inu"),
    Polkadot => ("polkadot", "DOT", "Polkadot"),
    Chainlink => ("chainlink", "LINK", "Chainlink"),
    Polygon => ("matic-network", "MATIC", "Matic-network"),
    Uniswap => ("uniswap", "UNI", "Uniswap"),
    Litecoin => ("litecoin", "LTC", "Litecoin"),
    Near => ("near", "NEAR", "Near"),
    Aptos => ("aptos", "APT", "Aptos"),
    Cosmos => ("cosmos", "ATOM", "Cosmos"),
    Stellar => ("stellar", "XLM", "Stellar"),
    Arbitrum => ("arbitrum", "ARB", "Arbitrum"),
    Optimism => ("optimism", "OP", "Optimism"),
    Filecoin => ("filecoin", "FIL", "Filecoin"),
    Hedera => ("hedera-hashgraph", "HBAR", "Hedera-hashgraph"),
    VeChain => ("vechain", "VET", "Vechain"),
    Injective => ("injective-protocol", "INJ", "Injective-protocol"),
    Algorand => ("algorand", "ALGO", "Algorand"),
    Quant => ("quant-network", "QNT", "Quant-network"),
    Maker => ("maker", "MKR", "Maker"),
    Aave => ("aave", "AAVE", "Aave"),
}

impl Coin {
    /// Look a coin up by its CoinGecko identifier
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|coin| coin.id() == id)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// Persisted as the bare CoinGecko id so the data file stays readable
impl Serialize for Coin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Self::from_id(&id)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown coin id `{id}`")))
    }
}
