/// Table names in the relational store and in the curated export directory.
/// These are the names downstream reports and the SQL verifier query against.
pub mod tables {
    pub const DIM_STORES: &str = "dim_lojas";
    pub const DIM_CONSULTANTS: &str = "dim_consultores";
    pub const FACT_TARGETS: &str = "fatos_metas";
    pub const FACT_SALES: &str = "fatos_vendas";
    pub const DIM_ARTISTS: &str = "dim_artistas";
    pub const DIM_GENRES: &str = "dim_generos";
    pub const FACT_MUSIC: &str = "fato_musica";
}

/// Source column names the pipeline keys on
pub mod columns {
    pub const SELLER_ID: &str = "IdSeller";
    pub const WAGE: &str = "Wage";
    pub const SALE_DATE: &str = "Date";
    pub const ARTIST: &str = "Artist";
    pub const TOP_GENRE: &str = "Top Genre";

    // Dimension attribute and surrogate-key columns
    pub const ARTIST_NAME: &str = "ArtistName";
    pub const ARTIST_ID: &str = "IdArtist";
    pub const GENRE_NAME: &str = "GenreName";
    pub const GENRE_ID: &str = "IdGenre";
}

/// Source column → fact column, in output order
pub const MUSIC_FACT_COLUMNS: &[(&str, &str)] = &[
    ("Index", "IdTrack"),
    ("Title", "Title"),
    ("IdArtist", "IdArtist"),
    ("IdGenre", "IdGenre"),
    ("Year", "ReleaseYear"),
    ("Streams (Thousand)", "Streams_Thousands"),
    ("Energy", "Energy"),
    ("Danceability", "Danceability"),
    ("Loudness (dB)", "Loudness_dB"),
    ("Liveness", "Liveness"),
    ("Valence", "Valence"),
    ("Length (Duration)", "Duration"),
    ("Acousticness", "Acousticness"),
    ("Speechiness", "Speechiness"),
    ("Popularity", "Popularity"),
];

pub const DEFAULT_CONFIG_FILE: &str = "etl.toml";
pub const DEFAULT_ARTIFACT: &str = ";;";
