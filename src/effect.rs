use crate::image::Image;

/// Renders a frame for a normalized time `t` in `[0, 1)`.
///
/// Implementations must tolerate being called with any `t`, in any order:
/// scrubbing and freezing re-render earlier or identical times.
pub trait FrameSource {
    fn render(&mut self, t: f64) -> &Image;
}

/// Options handed to an effect before its first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectOptions {
    pub width: usize,
    pub height: usize,
}

/// An effect that evolves one step per call instead of following a clock.
pub trait ProgressiveEffect {
    fn reset(&mut self, options: EffectOptions);
    fn render(&mut self) -> &Image;
}

/// Presents a [`ProgressiveEffect`] through the timed loop; `t` is ignored.
pub struct Progressive<E> {
    inner: E,
}

impl<E: ProgressiveEffect> Progressive<E> {
    pub fn new(mut inner: E, options: EffectOptions) -> Self {
        inner.reset(options);
        Self { inner }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: ProgressiveEffect> FrameSource for Progressive<E> {
    fn render(&mut self, _t: f64) -> &Image {
        self.inner.render()
    }
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn render(&mut self, t: f64) -> &Image {
        (**self).render(t)
    }
}
