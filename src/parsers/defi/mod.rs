mod aave_v3;
mod curve;
mod lido;
mod morpho;
mod pancakeswap;
mod pendle;
mod uniswap_v3;

pub use aave_v3::{AaveV3Parser, AAVE_V3_POOL};
pub use curve::{CurvePoolParser, CURVE_POOLS};
pub use lido::LidoParser;
pub use morpho::{MetaMorphoVaultParser, MorphoBlueParser, METAMORPHO_VAULTS, MORPHO_BLUE};
pub use pancakeswap::{PancakeSwapParser, PANCAKESWAP_ROUTERS};
pub use pendle::PendleParser;
pub use uniswap_v3::{UniswapV3Parser, UNISWAP_V3_NFT_MANAGER, UNISWAP_V3_ROUTERS};
