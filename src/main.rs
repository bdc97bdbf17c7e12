//! 交互式命令行：逐行读取 stdin，经管线处理后输出结果

use std::path::PathBuf;

use command_bridge::domains::BuiltinBackends;
use command_bridge::setup::{self, SetupResult};
use command_bridge::PipelineOutcome;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> SetupResult<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = setup::load_config(config_path).await?;
    setup::init_logging(&config)?;

    let model = setup::model_from_config(&config.model);
    let components = setup::build_pipeline(&config, BuiltinBackends::default(), model)?;
    let pipeline = components.pipeline;
    info!("就绪，已注册领域: {}", components.registry.domains().join(", "));

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        prompt(&mut stdout, "> ").await;
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("读取输入失败: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let outcome = pipeline.handle(line).await;
        println!("{}", outcome.render());

        if let PipelineOutcome::NeedsConfirmation { command, .. } = outcome {
            prompt(&mut stdout, &format!("Run `{}`? [y/N] ", command.to_command_line())).await;
            let answer = lines.next_line().await.ok().flatten().unwrap_or_default();
            if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("{}", pipeline.confirm(&command).await.content);
            } else {
                println!("Cancelled.");
            }
        }
    }

    info!("退出");
    Ok(())
}

async fn prompt(stdout: &mut io::Stdout, text: &str) {
    // 提示符写失败不影响后续处理
    let _ = stdout.write_all(text.as_bytes()).await;
    let _ = stdout.flush().await;
}
