//! Maintenance CLI: provision accounts and backfill content records.
//!
//! Each run opens one pool, performs a single command and closes the pool
//! again whether the command succeeded or not. Failures surface as a
//! non-zero exit with the diagnostic on stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use talentsite::{
    posts::{assign_images, backfill::load_manifest, BackfillOutcome, ImageAssignment, Post},
    store::{PgStore, RecordStore},
    telemetry,
    users::{provision_user, ProvisionUser, Role, User},
};

#[derive(Parser, Debug)]
#[command(name = "talentsite-seed")]
#[command(version, about = "Provision accounts and backfill content records", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user, or update role/verification of an existing one
    User {
        #[arg(long)]
        email: String,
        /// user, editor or admin; required on creation, kept on reruns without it
        #[arg(long)]
        role: Option<Role>,
        /// Display name, only used when the account is created
        #[arg(long)]
        name: Option<String>,
        /// Initial password, only used when the account is created
        #[arg(long, env = "SEED_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Mark the email address as verified
        #[arg(long)]
        verified: bool,
    },

    /// Set the featured image of one post
    PostImage {
        #[arg(long)]
        slug: String,
        /// Site-relative path, e.g. /images/blog/cover.png
        #[arg(long)]
        image: String,
        /// Directory the image path must exist under
        #[arg(long, env = "STATIC_ROOT")]
        static_root: Option<PathBuf>,
    },

    /// Set featured images from a JSON manifest of {slug, image} entries
    PostImages {
        manifest: PathBuf,
        #[arg(long, env = "STATIC_ROOT")]
        static_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("talentsite=info");

    let cli = Cli::parse();
    let store = PgStore::connect(&cli.database_url, 1)
        .await
        .context("connect to database")?;

    let result = run(cli.command, &store, &store).await;
    store.close().await;
    result
}

async fn run<U, P>(command: Command, users: &U, posts: &P) -> anyhow::Result<()>
where
    U: RecordStore<User> + ?Sized,
    P: RecordStore<Post> + ?Sized,
{
    match command {
        Command::User {
            email,
            role,
            name,
            password,
            verified,
        } => {
            let out = provision_user(
                users,
                ProvisionUser {
                    email,
                    name,
                    role,
                    password,
                    verified,
                },
            )
            .await?;
            println!(
                "{} user {} ({}, id {})",
                out.disposition, out.record.email, out.record.role, out.record.id
            );
        }
        Command::PostImage {
            slug,
            image,
            static_root,
        } => {
            let assignment = ImageAssignment { slug, image };
            backfill(posts, &[assignment], static_root).await?;
        }
        Command::PostImages {
            manifest,
            static_root,
        } => {
            let entries = load_manifest(&manifest).await?;
            backfill(posts, &entries, static_root).await?;
        }
    }
    Ok(())
}

/// Returns `(updated, skipped)`.
async fn backfill<S>(
    store: &S,
    entries: &[ImageAssignment],
    static_root: Option<PathBuf>,
) -> anyhow::Result<(usize, usize)>
where
    S: RecordStore<Post> + ?Sized,
{
    let outcomes = assign_images(store, entries, static_root.as_deref()).await?;
    let (mut patched, mut skipped) = (0usize, 0usize);
    for outcome in outcomes {
        match outcome {
            BackfillOutcome::Patched(post) => {
                patched += 1;
                println!("updated post {} -> {}", post.slug, post.image.unwrap_or_default());
            }
            BackfillOutcome::Missing(slug) => {
                skipped += 1;
                println!("skipped {slug}: no post with that slug");
            }
        }
    }
    println!("{patched} updated, {skipped} skipped");
    Ok((patched, skipped))
}
