// Adapters layer: concrete HTTP implementations of the domain ports.

pub mod calil;
pub mod perplexity;

pub use calil::CalilClient;
pub use perplexity::PerplexityClient;
