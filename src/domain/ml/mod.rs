pub mod feature_codec;
