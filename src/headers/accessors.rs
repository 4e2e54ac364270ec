//! Named accessors for common headers.
//!
//! Each accessor binds one header name to `get`, `set` and `has`. The table is
//! static; typed convenience methods on `Headers` are generated from it at
//! compile time.

use std::borrow::Cow;

use crate::headers::container::Headers;
use crate::headers::parse::format_header_name;
use crate::headers::value::HeaderValue;

/// `get`/`set`/`has` bound to one header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAccessor {
    name: Cow<'static, str>,
}

impl HeaderAccessor {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// Accessor for an arbitrary header, with a Title-Cased name.
    pub fn custom(name: &str) -> Self {
        Self {
            name: Cow::Owned(format_header_name(name)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get<'a>(&self, headers: &'a Headers) -> Option<&'a HeaderValue> {
        headers.get(&self.name)
    }

    pub fn set(&self, headers: &mut Headers, value: impl Into<HeaderValue>, overwrite: Option<bool>) {
        headers.set_with(&self.name, value, overwrite);
    }

    pub fn has(&self, headers: &Headers) -> bool {
        headers.has(&self.name)
    }
}

macro_rules! header_accessors {
    ($( $get:ident, $set:ident, $has:ident => $name:literal; )*) => {
        /// Names with a registered accessor.
        pub static ACCESSOR_NAMES: &[&str] = &[ $( $name, )* ];

        impl Headers {
            $(
                #[doc = concat!("Read `", $name, "`.")]
                pub fn $get(&self) -> Option<&HeaderValue> {
                    self.get($name)
                }

                #[doc = concat!("Write `", $name, "` under the given overwrite policy.")]
                pub fn $set(&mut self, value: impl Into<HeaderValue>, overwrite: Option<bool>) -> &mut Self {
                    self.set_with($name, value, overwrite)
                }

                pub fn $has(&self) -> bool {
                    self.has($name)
                }
            )*
        }
    };
}

header_accessors! {
    content_type, set_content_type, has_content_type => "Content-Type";
    content_length, set_content_length, has_content_length => "Content-Length";
    accept, set_accept, has_accept => "Accept";
    accept_encoding, set_accept_encoding, has_accept_encoding => "Accept-Encoding";
    user_agent, set_user_agent, has_user_agent => "User-Agent";
    authorization, set_authorization, has_authorization => "Authorization";
}

/// Look up a registered accessor by case-insensitive name.
pub fn accessor(name: &str) -> Option<HeaderAccessor> {
    ACCESSOR_NAMES
        .iter()
        .find(|n| n.eq_ignore_ascii_case(name.trim()))
        .map(|n| HeaderAccessor::new(*n))
}
