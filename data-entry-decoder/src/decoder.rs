//! The [`Decoder`] trait and its generic adapters

use serde_json::Value;

use crate::error::Result;

/// Turns an untyped JSON value into a typed one, or explains why it cannot.
///
/// Decoders are plain values: build them once, share them freely, and call
/// [`Decoder::decode`] as often as needed.
pub trait Decoder: Send + Sync {
    /// The type produced by a successful decode
    type Output;

    /// Decode `input`.
    fn decode(&self, input: &Value) -> Result<Self::Output>;

    /// Transform the decoded value.
    fn map<F, B>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> B + Send + Sync,
    {
        Map { decoder: self, f }
    }

    /// Erase the concrete decoder type.
    fn boxed(self) -> BoxDecoder<Self::Output>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

/// A type-erased decoder
pub type BoxDecoder<T> = Box<dyn Decoder<Output = T>>;

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    type Output = D::Output;

    fn decode(&self, input: &Value) -> Result<Self::Output> {
        (**self).decode(input)
    }
}

impl<D: Decoder + ?Sized> Decoder for &D {
    type Output = D::Output;

    fn decode(&self, input: &Value) -> Result<Self::Output> {
        (**self).decode(input)
    }
}

/// Decoder returned by [`Decoder::map`]
pub struct Map<D, F> {
    decoder: D,
    f: F,
}

impl<D, F, B> Decoder for Map<D, F>
where
    D: Decoder,
    F: Fn(D::Output) -> B + Send + Sync,
{
    type Output = B;

    fn decode(&self, input: &Value) -> Result<B> {
        self.decoder.decode(input).map(&self.f)
    }
}

/// Decoder backed by a closure
pub struct FromFn<F>(F);

/// Build a decoder from a closure.
pub fn from_fn<F, T>(f: F) -> FromFn<F>
where
    F: Fn(&Value) -> Result<T> + Send + Sync,
{
    FromFn(f)
}

impl<F, T> Decoder for FromFn<F>
where
    F: Fn(&Value) -> Result<T> + Send + Sync,
{
    type Output = T;

    fn decode(&self, input: &Value) -> Result<T> {
        (self.0)(input)
    }
}
