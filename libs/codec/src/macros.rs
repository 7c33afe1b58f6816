//! Message type declaration macro
//!
//! [`message!`](crate::message) turns a field list into a struct with a
//! static [`TypeTag`](types::TypeTag), a correctly sized fingerprint and the
//! complete [`Cell`](crate::Cell) chain. Each field `foo` gets:
//!
//! - `foo()` getter
//! - `set_foo(v)` / `with_foo(v)` assigning the value and touching the bit
//! - `has_foo()` presence test
//! - `clear_foo()` resetting to default and wiping the bit
//! - `FOO_BIT` constant with the absolute fingerprint index
//!
//! ```rust
//! codec::message! {
//!     /// Top of book
//!     pub struct Quote: 4001 {
//!         bid: i64,
//!         venue: String,
//!     }
//! }
//!
//! codec::message! {
//!     pub struct TimedQuote: 4002 extends Quote {
//!         exchange_ns: u64,
//!     }
//! }
//!
//! let mut quote = TimedQuote::new().with_exchange_ns(7);
//! quote.set_bid(101);
//! assert_eq!(*quote.bid(), 101);
//! assert!(quote.has_bid());
//! assert!(!quote.has_venue());
//! assert_eq!(TimedQuote::EXCHANGE_NS_BIT, 2);
//! ```

/// Declare a message type; see the [module documentation](crate::macros)
#[macro_export]
macro_rules! message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $id:literal {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $crate::paste::paste! {
            $(#[$meta])*
            #[derive(Debug, Clone)]
            $vis struct $name {
                fingerprint: $crate::types::Fingerprint,
                $( $field: $ty, )*
            }

            impl $name {
                pub const TAG: &'static $crate::types::TypeTag = &$crate::types::TypeTag::root(
                    $id,
                    stringify!($name),
                    $crate::message!(@count $($field)*),
                );

                #[doc(hidden)]
                pub fn with_fingerprint_len(len: usize) -> Self {
                    Self {
                        fingerprint: $crate::types::Fingerprint::new(len),
                        $( $field: <$ty as ::core::default::Default>::default(), )*
                    }
                }
            }

            $crate::message!(@common $name [$( [$(#[$fmeta])*] $field : $ty ),*]);

            #[allow(unused_variables)]
            impl $crate::Cell for $name {
                fn type_tag(&self) -> &'static $crate::types::TypeTag {
                    Self::TAG
                }

                fn fingerprint(&self) -> &$crate::types::Fingerprint {
                    &self.fingerprint
                }

                fn fingerprint_mut(&mut self) -> &mut $crate::types::Fingerprint {
                    &mut self.fingerprint
                }

                fn level(&self, tag: &$crate::types::TypeTag) -> Option<&dyn ::core::any::Any> {
                    if tag.id() == Self::TAG.id() {
                        Some(self as &dyn ::core::any::Any)
                    } else {
                        None
                    }
                }

                fn eq_fields(
                    &self,
                    other: &dyn $crate::Cell,
                    mask: &$crate::types::Fingerprint,
                ) -> bool {
                    $crate::message!(@eq self other mask [$($field)*])
                }

                fn hash_fields(
                    &self,
                    mask: &$crate::types::Fingerprint,
                    state: &mut dyn ::core::hash::Hasher,
                ) {
                    $crate::message!(@hash self mask state [$($field)*]);
                }

                fn encode_fields(
                    &self,
                    enc: &mut dyn $crate::Encoder,
                    target: &$crate::types::TypeTag,
                ) -> $crate::CodecResult<bool> {
                    $crate::Encoder::write_fingerprint(enc, &self.fingerprint, target.field_count())?;
                    $crate::message!(@encode self enc [$($field)*]);
                    Ok(target.id() != Self::TAG.id())
                }

                fn decode_fields(
                    &mut self,
                    de: &mut $crate::Deserializer<'_>,
                ) -> $crate::CodecResult<()> {
                    de.read_fingerprint_into(&mut self.fingerprint)?;
                    $crate::message!(@decode self de [$($field)*]);
                    Ok(())
                }

                fn describe_fields(&self, out: &mut $crate::Description) {
                    $crate::message!(@describe self out [$($field)*]);
                }

                $crate::message!(@boxing);
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $id:literal extends $base:ty {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $crate::paste::paste! {
            $(#[$meta])*
            #[derive(Debug, Clone)]
            $vis struct $name {
                base: $base,
                $( $field: $ty, )*
            }

            impl $name {
                pub const TAG: &'static $crate::types::TypeTag = &$crate::types::TypeTag::derived(
                    $id,
                    stringify!($name),
                    <$base>::TAG,
                    $crate::message!(@count $($field)*),
                );

                #[doc(hidden)]
                pub fn with_fingerprint_len(len: usize) -> Self {
                    Self {
                        base: <$base>::with_fingerprint_len(len),
                        $( $field: <$ty as ::core::default::Default>::default(), )*
                    }
                }

                pub fn into_base(self) -> $base {
                    self.base
                }
            }

            impl ::core::ops::Deref for $name {
                type Target = $base;

                fn deref(&self) -> &$base {
                    &self.base
                }
            }

            impl ::core::ops::DerefMut for $name {
                fn deref_mut(&mut self) -> &mut $base {
                    &mut self.base
                }
            }

            $crate::message!(@common $name [$( [$(#[$fmeta])*] $field : $ty ),*]);

            #[allow(unused_variables)]
            impl $crate::Cell for $name {
                fn type_tag(&self) -> &'static $crate::types::TypeTag {
                    Self::TAG
                }

                fn fingerprint(&self) -> &$crate::types::Fingerprint {
                    $crate::Cell::fingerprint(&self.base)
                }

                fn fingerprint_mut(&mut self) -> &mut $crate::types::Fingerprint {
                    $crate::Cell::fingerprint_mut(&mut self.base)
                }

                fn level(&self, tag: &$crate::types::TypeTag) -> Option<&dyn ::core::any::Any> {
                    if tag.id() == Self::TAG.id() {
                        Some(self as &dyn ::core::any::Any)
                    } else {
                        $crate::Cell::level(&self.base, tag)
                    }
                }

                fn eq_fields(
                    &self,
                    other: &dyn $crate::Cell,
                    mask: &$crate::types::Fingerprint,
                ) -> bool {
                    $crate::Cell::eq_fields(&self.base, other, mask)
                        && $crate::message!(@eq self other mask [$($field)*])
                }

                fn hash_fields(
                    &self,
                    mask: &$crate::types::Fingerprint,
                    state: &mut dyn ::core::hash::Hasher,
                ) {
                    $crate::Cell::hash_fields(&self.base, mask, state);
                    $crate::message!(@hash self mask state [$($field)*]);
                }

                fn encode_fields(
                    &self,
                    enc: &mut dyn $crate::Encoder,
                    target: &$crate::types::TypeTag,
                ) -> $crate::CodecResult<bool> {
                    if !$crate::Cell::encode_fields(&self.base, enc, target)? {
                        return Ok(false);
                    }
                    $crate::message!(@encode self enc [$($field)*]);
                    Ok(target.id() != Self::TAG.id())
                }

                fn decode_fields(
                    &mut self,
                    de: &mut $crate::Deserializer<'_>,
                ) -> $crate::CodecResult<()> {
                    $crate::Cell::decode_fields(&mut self.base, de)?;
                    $crate::message!(@decode self de [$($field)*]);
                    Ok(())
                }

                fn describe_fields(&self, out: &mut $crate::Description) {
                    $crate::Cell::describe_fields(&self.base, out);
                    $crate::message!(@describe self out [$($field)*]);
                }

                $crate::message!(@boxing);
            }
        }
    };

    // Accessors, constructors and trait impls shared by both forms
    (@common $name:ident [$( [$(#[$fmeta:meta])*] $field:ident : $ty:ty ),*]) => {
        $crate::paste::paste! {
            #[doc(hidden)]
            #[allow(non_camel_case_types, dead_code)]
            #[derive(Clone, Copy)]
            enum [<$name FieldIndex>] {
                $( $field, )*
            }

            #[allow(dead_code)]
            impl $name {
                pub fn new() -> Self {
                    <Self as ::core::default::Default>::default()
                }

                $(
                    pub const [<$field:upper _BIT>]: usize =
                        Self::TAG.offset() + [<$name FieldIndex>]::$field as usize;

                    $(#[$fmeta])*
                    #[inline]
                    pub fn $field(&self) -> &$ty {
                        &self.$field
                    }

                    pub fn [<set_ $field>](&mut self, value: $ty) -> &mut Self {
                        self.$field = value;
                        $crate::Cell::fingerprint_mut(self).set_bit(Self::[<$field:upper _BIT>]);
                        self
                    }

                    pub fn [<with_ $field>](mut self, value: $ty) -> Self {
                        self.[<set_ $field>](value);
                        self
                    }

                    #[inline]
                    pub fn [<has_ $field>](&self) -> bool {
                        $crate::Cell::fingerprint(self).contains(Self::[<$field:upper _BIT>])
                    }

                    pub fn [<clear_ $field>](&mut self) -> &mut Self {
                        self.$field = <$ty as ::core::default::Default>::default();
                        $crate::Cell::fingerprint_mut(self).clear_bit(Self::[<$field:upper _BIT>]);
                        self
                    }
                )*
            }

            impl ::core::default::Default for $name {
                fn default() -> Self {
                    Self::with_fingerprint_len(Self::TAG.field_count())
                }
            }

            impl ::core::cmp::PartialEq for $name {
                fn eq(&self, other: &Self) -> bool {
                    $crate::CellExt::structural_eq(self, other)
                }
            }

            impl $crate::Message for $name {
                const TAG: &'static $crate::types::TypeTag = $name::TAG;
            }
        }
    };

    (@eq $self:ident $other:ident $mask:ident [$($field:ident)*]) => {
        $crate::paste::paste! {
            match $crate::Cell::level($other, Self::TAG)
                .and_then(|level| level.downcast_ref::<Self>())
            {
                Some(_other) => true $(
                    && (!$mask.contains(Self::[<$field:upper _BIT>])
                        || $crate::Field::field_eq(&$self.$field, &_other.$field))
                )*,
                None => false,
            }
        }
    };

    (@hash $self:ident $mask:ident $state:ident [$($field:ident)*]) => {
        $crate::paste::paste! {
            $(
                if $mask.contains(Self::[<$field:upper _BIT>]) {
                    $crate::Field::field_hash(&$self.$field, $state);
                }
            )*
        }
    };

    (@encode $self:ident $enc:ident [$($field:ident)*]) => {
        $crate::paste::paste! {
            $(
                if $crate::Cell::fingerprint($self).contains(Self::[<$field:upper _BIT>]) {
                    $crate::Field::encode(&$self.$field, $enc)?;
                }
            )*
        }
    };

    (@decode $self:ident $de:ident [$($field:ident)*]) => {
        $crate::paste::paste! {
            $(
                if $crate::Cell::fingerprint($self).contains(Self::[<$field:upper _BIT>]) {
                    $self.$field = $crate::Field::decode($de)?;
                }
            )*
        }
    };

    (@describe $self:ident $out:ident [$($field:ident)*]) => {
        $crate::paste::paste! {
            $(
                if $crate::Cell::fingerprint($self).contains(Self::[<$field:upper _BIT>]) {
                    $out.field(stringify!($field), &$self.$field);
                }
            )*
        }
    };

    (@boxing) => {
        fn clone_cell(&self) -> Box<dyn $crate::Cell> {
            Box::new(::core::clone::Clone::clone(self))
        }

        fn as_any(&self) -> &dyn ::core::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn ::core::any::Any + Send + Sync> {
            self
        }
    };

    (@count $($field:ident)*) => {
        <[()]>::len(&[$($crate::message!(@unit $field)),*])
    };

    (@unit $field:ident) => {
        ()
    };
}
