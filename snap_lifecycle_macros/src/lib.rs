mod record;

use proc_macro::TokenStream;

/// Derive macro implementing `snap_lifecycle::Record` for a struct.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Record)]
/// #[record(collection = "snaps")]
/// struct Snap {
///     #[record(id)]
///     pub id: String,
///     pub viewed: bool,
/// }
/// ```
///
/// - `collection` defaults to the snake_case struct name plus `s`.
/// - The id field is the one marked `#[record(id)]`, or a field named `id`.
///   It must be a `String`; the store writes the assigned id into it.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
