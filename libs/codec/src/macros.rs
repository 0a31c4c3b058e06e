//! Declarative macros for message types and message sets

/// Define a concrete message as a sequence of fields
///
/// Generates the struct, its [`Message`](crate::Message) implementation
/// (fields read and written in declaration order) and
/// [`StaticMessage`](crate::StaticMessage) with the given identifier.
///
/// ```rust
/// use strata_codec::{define_message, IntField, Message};
///
/// define_message! {
///     /// Single 16-bit reading
///     pub struct Reading: u8 = 0x01 {
///         pub value: IntField<u16>,
///     }
/// }
///
/// let reading = Reading { value: IntField::new(0x1234) };
/// assert_eq!(reading.length(), 2);
/// assert_eq!(reading.id(), 0x01);
/// ```
#[macro_export]
macro_rules! define_message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $id_ty:ty = $id:literal {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field: $field_ty, )*
        }

        impl $crate::StaticMessage for $name {
            const MSG_ID: $id_ty = $id;
            const NAME: &'static str = stringify!($name);
        }

        impl $crate::Message for $name {
            type Id = $id_ty;

            fn id(&self) -> $id_ty {
                <Self as $crate::StaticMessage>::MSG_ID
            }

            fn name(&self) -> &'static str {
                <Self as $crate::StaticMessage>::NAME
            }

            #[allow(unused_mut)]
            fn read(&mut self, buf: &mut &[u8]) -> $crate::ProtocolResult<()> {
                let mut cursor: &[u8] = *buf;
                $( $crate::Field::read(&mut self.$field, &mut cursor)?; )*
                *buf = cursor;
                Ok(())
            }

            #[allow(unused_variables)]
            fn write(&self, sink: &mut dyn $crate::ByteSink) -> $crate::ProtocolResult<()> {
                $( $crate::Field::write(&self.$field, sink)?; )*
                Ok(())
            }

            fn length(&self) -> usize {
                0 $( + $crate::Field::length(&self.$field) )*
            }

            fn valid(&self) -> bool {
                true $( && $crate::Field::valid(&self.$field) )*
            }
        }
    };
}

/// Define a message set: an enum over concrete message types, its registry
/// descriptors and a handler trait for double dispatch
///
/// The handler trait gets one `handle_<type>` method per message type, each
/// defaulting to the common `handle_message` fallback.
///
/// ```rust
/// use strata_codec::{define_message, dispatch, message_set, IntField, Message};
///
/// define_message! {
///     pub struct Ping: u8 = 0x01 {
///         pub seq: IntField<u16>,
///     }
/// }
///
/// define_message! {
///     pub struct Pong: u8 = 0x02 {
///         pub seq: IntField<u16>,
///     }
/// }
///
/// message_set! {
///     pub enum Heartbeat: u8, handler HeartbeatHandler {
///         Ping,
///         Pong,
///     }
/// }
///
/// #[derive(Default)]
/// struct Counter {
///     pings: usize,
///     other: usize,
/// }
///
/// impl HeartbeatHandler for Counter {
///     fn handle_message(&mut self, _msg: &dyn Message<Id = u8>) {
///         self.other += 1;
///     }
///
///     fn handle_ping(&mut self, _msg: &Ping) {
///         self.pings += 1;
///     }
/// }
///
/// let mut counter = Counter::default();
/// dispatch(&Heartbeat::from(Ping::default()), &mut counter);
/// dispatch(&Heartbeat::from(Pong::default()), &mut counter);
/// assert_eq!((counter.pings, counter.other), (1, 1));
/// ```
#[macro_export]
macro_rules! message_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $id_ty:ty, handler $handler:ident {
            $( $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis enum $name {
            $( $variant($variant), )+
        }

        impl $crate::Message for $name {
            type Id = $id_ty;

            fn id(&self) -> $id_ty {
                match self {
                    $( $name::$variant(msg) => $crate::Message::id(msg), )+
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant(msg) => $crate::Message::name(msg), )+
                }
            }

            fn read(&mut self, buf: &mut &[u8]) -> $crate::ProtocolResult<()> {
                match self {
                    $( $name::$variant(msg) => $crate::Message::read(msg, buf), )+
                }
            }

            fn write(&self, sink: &mut dyn $crate::ByteSink) -> $crate::ProtocolResult<()> {
                match self {
                    $( $name::$variant(msg) => $crate::Message::write(msg, sink), )+
                }
            }

            fn length(&self) -> usize {
                match self {
                    $( $name::$variant(msg) => $crate::Message::length(msg), )+
                }
            }

            fn valid(&self) -> bool {
                match self {
                    $( $name::$variant(msg) => $crate::Message::valid(msg), )+
                }
            }
        }

        impl $crate::MessageSet for $name {
            fn descriptors() -> Vec<$crate::Descriptor<Self>> {
                vec![
                    $(
                        $crate::Descriptor::new(
                            <$variant as $crate::StaticMessage>::MSG_ID,
                            <$variant as $crate::StaticMessage>::NAME,
                            || $name::$variant(<$variant as Default>::default()),
                        ),
                    )+
                ]
            }
        }

        $(
            impl From<$variant> for $name {
                fn from(msg: $variant) -> Self {
                    $name::$variant(msg)
                }
            }
        )+

        $crate::paste::paste! {
            /// Receives the messages of one message set, one method per type
            $vis trait $handler {
                /// Fallback for every message type without its own override
                fn handle_message(&mut self, msg: &dyn $crate::Message<Id = $id_ty>);

                $(
                    fn [<handle_ $variant:snake>](&mut self, msg: &$variant) {
                        self.handle_message(msg)
                    }
                )+
            }

            impl<H: $handler + ?Sized> $crate::Dispatch<H> for $name {
                fn dispatch(&self, handler: &mut H) {
                    match self {
                        $( $name::$variant(msg) => handler.[<handle_ $variant:snake>](msg), )+
                    }
                }
            }
        }
    };
}
