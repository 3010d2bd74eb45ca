/// Unwraps a `oneof { data, error }` reply body into `Result<Data, ClientError>`
///. Every RPC in this schema replies this shape, so every low-level
/// facade method ends with one call to this macro rather than hand-rolled
/// matching.
macro_rules! unwrap_body {
    ($body:expr, $variant:path) => {{
        use $variant as UnwrapBodyVariant;
        match $body {
            Some(UnwrapBodyVariant::Data(data)) => Ok(data),
            Some(UnwrapBodyVariant::Error(error)) => Err(crate::error::ClientError::from(error)),
            None => Err(crate::error::empty_reply()),
        }
    }};
}

pub(crate) use unwrap_body;
