use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use signed_image_uploader::signing::POSTING_ROLE;
use signed_image_uploader::{
    ImageFile, ImageUploader, PostingKey, ProgressEvent, StaticIdentity, UploaderConfig,
};
use tracing_subscriber::EnvFilter;

/// Upload an image to the hosting endpoint, signed with a posting key.
#[derive(Parser)]
struct Args {
    /// Image file to upload.
    file: PathBuf,
    #[clap(long, env = "IMAGE_UPLOAD_ENDPOINT")]
    endpoint: String,
    #[clap(long, env = "UPLOAD_USER")]
    user: Option<String>,
    /// WIF-encoded private posting key.
    #[clap(long, env = "POSTING_KEY", hide_env_values = true)]
    posting_key: Option<String>,
    /// Master password; the posting key is derived from it and the user name.
    #[clap(long, env = "UPLOAD_PASSWORD", hide_env_values = true, conflicts_with = "posting_key")]
    password: Option<String>,
    #[clap(long, env = "UPLOAD_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    /// Print progress events as JSON lines on stdout.
    #[clap(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = UploaderConfig::new(&args.endpoint)?;
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let uploader = ImageUploader::new(config)?;
    let identity = identity_from_args(&args)?;

    let cancel = uploader.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let json = args.json;
    let sink = move |event: ProgressEvent| print_event(&event, json);
    let file = ImageFile::from_path(&args.file);

    match uploader.upload(&identity, &file, &sink).await {
        Ok(url) => {
            if !json {
                println!("{url}");
            }
            Ok(ExitCode::SUCCESS)
        }
        // already reported through the progress sink
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

fn identity_from_args(args: &Args) -> anyhow::Result<StaticIdentity> {
    let mut identity = StaticIdentity::anonymous();
    if let Some(user) = &args.user {
        identity = identity.with_user(user);
    }

    match (&args.user, &args.posting_key, &args.password) {
        (_, Some(key), _) => identity = identity.with_posting_key(key),
        (Some(user), None, Some(password)) => {
            let key = PostingKey::from_login(user, password, POSTING_ROLE)?;
            identity = identity.with_posting_key(key.to_wif());
        }
        _ => {}
    }
    Ok(identity)
}

fn print_event(event: &ProgressEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize progress event"),
        }
        return;
    }

    match event {
        ProgressEvent::Message(message) => eprintln!("{message}"),
        ProgressEvent::Error(error) => eprintln!("error: {error}"),
        ProgressEvent::Url(_) => {}
    }
}
