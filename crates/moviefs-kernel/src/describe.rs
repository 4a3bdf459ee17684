//! Plain-text description served as each item's `info` file.
//!
//! The layout is fixed; the reported file size is the byte length of exactly
//! this text, so any change here changes every `info` size too.

use std::fmt::Display;

use moviefs_catalog::Item;

/// Name of the synthetic description file inside every item directory.
pub const INFO_NAME: &str = "info";

/// Rendered in place of absent optional fields.
const UNKNOWN: &str = "unknown";

fn or_unknown<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

/// Render the description of `item`.
pub fn describe(item: &Item) -> String {
    let released = item
        .released
        .map(|d| d.format("%d. %B %Y").to_string());
    format!(
        "\n{name} ({year})\n'{tagline}'\n\nGenres: {genres}\n\n\
         Released: {released}\nRuntime: {runtime} Minutes\nHomepage: {homepage}\nImdb id: {imdb}\n\n\
         Movie Resolution: {res_x}x{res_y}\n\nActors:\n - {actors}\n\n",
        name = item.name,
        year = or_unknown(item.year),
        tagline = or_unknown(item.tagline.as_deref()),
        genres = item.genres.join(", "),
        released = or_unknown(released),
        runtime = or_unknown(item.runtime),
        homepage = or_unknown(item.homepage.as_deref()),
        imdb = or_unknown(item.imdb_id.as_deref()),
        res_x = or_unknown(item.res_x),
        res_y = or_unknown(item.res_y),
        actors = item.actors.join("\n - "),
    )
}
