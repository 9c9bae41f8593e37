use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use jobhistory::config::Config;
use jobhistory::db;
use jobhistory::jobs::views::ConfigTypeView;
use jobhistory::jobs::{
    ConfigType, FsLogTailReader, HistoryService, JobId, JobOutput, JobScope, JobsRepo,
};
use serde::Serialize;

const USAGE: &str = "jobhistctl <command>\n\
     Commands:\n\
     - migrate\n\
     - seed-demo [config_id]\n\
     - list <config_type> <config_id>\n\
     - show <job_id>\n\
     \n\
     Uses DATABASE_URL; logs are written under JOBHIST_LOG_ROOT (default ./logs).\n";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let cfg = Config::from_env()?;
    let pool = db::make_pool(&cfg.database_url).await?;
    let repo = JobsRepo::new(pool.clone());
    let log_root = cfg.log_root.clone().unwrap_or_else(|| PathBuf::from("logs"));

    let history = HistoryService::new(
        Arc::new(repo.clone()),
        Arc::new(FsLogTailReader::new(Some(log_root.clone()))),
    )
    .with_log_tail_lines(cfg.log_tail_lines)
    .with_query_timeout(cfg.query_timeout);

    match args[1].as_str() {
        "migrate" => {
            db::run_migrations(&pool).await?;
            println!("migrations OK");
        }
        "seed-demo" => {
            let config_id = args.get(2).map(String::as_str).unwrap_or("demo-connection");
            let scope = JobScope::new(ConfigType::Sync, config_id)?;
            let job_id = seed_demo(&repo, &scope, &log_root).await?;
            println!("+ seeded job id={job_id} scope={scope}");
        }
        "list" => {
            let (Some(config_type), Some(config_id)) = (args.get(2), args.get(3)) else {
                anyhow::bail!("usage: jobhistctl list <config_type> <config_id>");
            };
            let config_type: ConfigTypeView =
                serde_json::from_value(serde_json::Value::String(config_type.clone()))
                    .with_context(|| format!("unknown config type {config_type:?}"))?;
            let jobs = history.list_jobs(config_type.into(), config_id).await?;
            print_json(&jobs)?;
        }
        "show" => {
            let id = args.get(2).context("usage: jobhistctl show <job_id>")?;
            let job_id: JobId = id.parse().with_context(|| format!("bad job id {id:?}"))?;
            let detail = history.get_job(job_id).await?;
            print_json(&detail)?;
        }
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

/// One job with a failed first attempt and a succeeded retry.
async fn seed_demo(repo: &JobsRepo, scope: &JobScope, log_root: &Path) -> anyhow::Result<JobId> {
    let job_id = repo.create_job(scope).await?;

    for (outcome, lines) in [("failed", 40), ("succeeded", 150)] {
        let relative = PathBuf::from(job_id.to_string()).join(format!("{outcome}.log"));
        let number = repo.create_attempt(job_id, &relative).await?;
        write_demo_log(&log_root.join(&relative), job_id, number, lines)?;

        if outcome == "failed" {
            repo.fail_attempt(job_id, number, None).await?;
        } else {
            let output = JobOutput::sync(lines as u64 * 10, lines as u64 * 1_024);
            repo.succeed_attempt(job_id, number, Some(&output)).await?;
        }
    }

    Ok(job_id)
}

fn write_demo_log(path: &Path, job_id: JobId, attempt: i32, lines: usize) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("create log {}", path.display()))?;
    for i in 1..=lines {
        writeln!(file, "job={job_id} attempt={attempt} line {i}")?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
