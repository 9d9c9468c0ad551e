use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Parser)]
#[command(
    name = "physicsbot-cli",
    about = "Upload study material to physicsbot and ask it questions"
)]
struct Cli {
    /// Base URL of the physicsbot server.
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload PDF or DOCX files to build the knowledge base.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a physics question.
    Ask { question: String },
}

#[derive(Deserialize)]
struct AnswerBody {
    answer: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    match cli.command {
        Command::Upload { files } => upload(&client, &base_url, &files).await,
        Command::Ask { question } => ask(&client, &base_url, &question).await,
    }
}

async fn upload(client: &reqwest::Client, base_url: &str, paths: &[PathBuf]) -> Result<()> {
    let mut form = Form::new();
    let mut attached = 0;
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        if bytes.is_empty() {
            eprintln!("skipping empty file {}", path.display());
            continue;
        }
        form = form.part("files", Part::bytes(bytes).file_name(file_name(path)));
        attached += 1;
    }

    if attached == 0 {
        eprintln!("Some files were empty or unreadable.");
        return Ok(());
    }

    let response = client
        .post(format!("{base_url}/upload"))
        .multipart(form)
        .send()
        .await
        .context("upload request failed")?;
    let status = response.status();
    let body = response.text().await.context("failed to read upload response")?;
    if !status.is_success() {
        bail!("Upload failed: {body}");
    }

    let summary: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    println!("Files uploaded and processed successfully.");
    if let Some(chunks) = summary.get("chunks_indexed") {
        println!("chunks indexed: {chunks}");
    }
    if let Some(skipped) = summary.get("skipped").and_then(Value::as_array)
        && !skipped.is_empty()
    {
        println!("skipped: {}", Value::Array(skipped.clone()));
    }
    Ok(())
}

async fn ask(client: &reqwest::Client, base_url: &str, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Please enter a question.");
    }

    let response = client
        .post(format!("{base_url}/query"))
        .json(&json!({ "question": question }))
        .send()
        .await
        .context("query request failed")?;
    let status = response.status();
    let body = response.text().await.context("failed to read query response")?;
    if !status.is_success() {
        bail!("Failed to get answer: {body}");
    }

    let answer = serde_json::from_str::<AnswerBody>(&body)
        .ok()
        .and_then(|parsed| parsed.answer)
        .filter(|answer| !answer.trim().is_empty())
        .unwrap_or_else(|| "No answer returned.".to_string());
    println!("{answer}");
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file.pdf".to_string())
}
