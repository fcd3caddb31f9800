//! Macros for declaring phase label types.

/// Declare a closed phase enum whose variants, in declaration order, form
/// its default sequence.
///
/// # Example
///
/// ```
/// use phaseline::phase_enum;
/// use phaseline::shell::{RunOptions, Sequencer};
///
/// phase_enum! {
///     pub enum Intro {
///         FadeIn,
///         Hold,
///         FadeOut,
///     }
/// }
///
/// assert_eq!(Intro::SEQUENCE, &[Intro::FadeIn, Intro::Hold, Intro::FadeOut]);
/// assert_eq!(Intro::Hold.name(), "Hold");
///
/// let sequencer = Sequencer::new(Intro::sequence(), RunOptions::new());
/// assert_eq!(sequencer.phase(), Some(Intro::FadeIn));
/// ```
#[macro_export]
macro_rules! phase_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const SEQUENCE: &'static [Self] = &[$(Self::$variant),*];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            pub fn sequence() -> $crate::core::Sequence<Self> {
                $crate::core::Sequence::from(Self::SEQUENCE)
            }
        }
    };
}
