use std::{fs, path::PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit and fetch complaints against a running server")]
struct Args {
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a complaint with an image file.
    Submit {
        pnr: String,

        subject: String,

        image: PathBuf,
    },

    /// Fetch a complaint by PNR.
    Get { pnr: String },

    /// List complaints that are still pending.
    Pending,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = Client::new();
    let base = args.url.trim_end_matches('/');

    let request = match args.command {
        Command::Submit {
            pnr,
            subject,
            image,
        } => {
            let bytes = fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());

            println!("Image size in bytes: {}", bytes.len());

            let form = Form::new()
                .text("pnr", pnr)
                .text("subject", subject)
                .part("image", Part::bytes(bytes).file_name(file_name));

            client
                .post(format!("{base}/submit-complaint"))
                .multipart(form)
        }
        Command::Get { pnr } => client.get(format!("{base}/get-complaints/{pnr}")),
        Command::Pending => client.get(format!("{base}/admin/pending-complaints")),
    };

    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;

    println!("{status}");
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("Request failed with {status}");
    }

    Ok(())
}
