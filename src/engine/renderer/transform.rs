// Scoped transform state for immediate-mode drawing

use glam::DAffine2;
use std::ops::{Deref, DerefMut};

/// Anything that keeps a stack of affine transforms applied to subsequent draw calls
pub trait TransformStack {
    /// Push a transform, composed with the current top of the stack
    fn push_transform(&mut self, transform: DAffine2);

    /// Pop the most recently pushed transform
    fn pop_transform(&mut self);
}

/// Guard that keeps a pushed transform active until it is dropped
///
/// The transform is popped on every exit path, including early returns and
/// unwinding out of a draw callback.
pub struct TransformScope<'a, S: TransformStack + ?Sized> {
    stack: &'a mut S,
}

impl<'a, S: TransformStack + ?Sized> TransformScope<'a, S> {
    /// Push `transform` and return the guard that will pop it
    pub fn push(stack: &'a mut S, transform: DAffine2) -> Self {
        stack.push_transform(transform);
        Self { stack }
    }
}

impl<S: TransformStack + ?Sized> Deref for TransformScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stack
    }
}

impl<S: TransformStack + ?Sized> DerefMut for TransformScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stack
    }
}

impl<S: TransformStack + ?Sized> Drop for TransformScope<'_, S> {
    fn drop(&mut self) {
        self.stack.pop_transform();
    }
}
