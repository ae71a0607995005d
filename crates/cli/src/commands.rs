use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest CSV files from the object store into the relational store
    Ingest {
        #[arg(
            long = "entity",
            short,
            help = "Entity to ingest; repeat for several",
            conflicts_with = "all"
        )]
        entities: Vec<String>,

        #[arg(long, help = "Ingest every entity of the catalog in dependency order")]
        all: bool,

        #[arg(long, help = "JSON schema catalog to use instead of the built-in one")]
        schemas: Option<String>,

        #[arg(
            long,
            help = "If specified, writes the JSON reports to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Check that the relational store and the object-store container are reachable
    Health,
    /// Print the active schema catalog
    Schemas {
        #[arg(long, help = "JSON schema catalog to use instead of the built-in one")]
        schemas: Option<String>,
    },
}
