//! Codec support. Only H.264 video is carried.

pub mod h264;

pub use h264::H264Codec;
