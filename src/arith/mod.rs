//! The arithmetic (MQ-coder) entropy-coding backend (Annex E).
//!
//! Every region/dictionary decoder that runs in arithmetic mode shares this
//! module's [`decoder::ArithDecoder`]/[`encoder::ArithEncoder`] pair and its
//! [`decoder::new_contexts`]-allocated context arrays; only the *meaning* of
//! each context index (a packed neighbor-pixel template, or an `IAxx` role)
//! differs per caller.

pub mod decoder;
pub mod encoder;
pub mod qe_table;

pub use decoder::{
    decode_iaid, decode_int, new_contexts, ArithDecoder, ContextArray, ContextCell, IntCtx,
    IntDecoderContexts,
};
pub use encoder::{encode_iaid, encode_int, encode_oob, ArithEncoder, IntEncoderContexts};
