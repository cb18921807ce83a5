// error.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
use rayon::ThreadPoolBuildError;
use std::fmt;
use std::io;
use std::num::TryFromIntError;

/// Errors encountered while decoding or encoding
#[derive(Debug)]
pub enum Error {
    /// A wrapped I/O error.
    Io(io::Error),
    /// Integer out of bounds.
    TryFromInt(TryFromIntError),
    /// Input ended where another byte was required.
    UnexpectedEndOfFile,
    /// [Header](block/struct.Header.html) signature is not `GIF87a` or
    /// `GIF89a`.
    InvalidHeader([u8; 6]),
    /// Byte found in trailer position is not `0x3B`.
    InvalidTrailer(u8),
    /// Identifier or comment is not valid text.
    InvalidStringEncoding,
    /// Fixed block size field has an unexpected value.
    InvalidBlockSize,
    /// Block terminator is not zero.
    InvalidBlockTerminator,
    /// Looping application extension malformed.
    InvalidLoopingExtension,
    /// [DisposalMethod](block/enum.DisposalMethod.html) outside 0-3.
    InvalidDisposalMethod(u8),
    /// Graphic control extension not followed by an image descriptor.
    MissingImageDescriptor,
    /// No local or global color table for a frame.
    MissingColorTable,
    /// Block introducer / label not recognized.
    UnrecognizedBlock([u8; 2]),
    /// Compressed LZW data invalid or corrupt
    InvalidLzwData,
    /// LZW minimum code size larger than 8.
    InvalidCodeSize,
    /// Image larger than specified by
    /// [max_image_sz](struct.Decoder.html#method.max_image_sz).
    TooLargeImage,
    /// Image data ended before every pixel was decoded.
    IncompleteImageData,
    /// Frame size does not match its descriptor, or lies outside the screen.
    InvalidFrameDimensions,
    /// Invalid color index in a frame.
    InvalidColorIndex,
    /// Palette has more colors than its color table can hold.
    InvalidColorTableSize,
    /// Worker thread pool could not be created.
    ThreadPool(ThreadPoolBuildError),
    /// A frame encoding worker failed.
    WorkerFailed,
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(fmt),
            Error::TryFromInt(err) => err.fmt(fmt),
            Error::ThreadPool(err) => err.fmt(fmt),
            Error::InvalidHeader(sig) => {
                write!(fmt, "InvalidHeader({:?})", String::from_utf8_lossy(sig))
            }
            _ => fmt::Debug::fmt(self, fmt),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::TryFromInt(ref err) => Some(err),
            Error::ThreadPool(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::TryFromInt(err)
    }
}

impl From<ThreadPoolBuildError> for Error {
    fn from(err: ThreadPoolBuildError) -> Self {
        Error::ThreadPool(err)
    }
}
