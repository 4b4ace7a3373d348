//! Xueqiu 포트폴리오 리밸런싱 감시 CLI.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cube_core::{init_logging, AppConfig, EventId, LogConfig, TradingWindow};
use cube_watcher::{build_poller, ProcessedEventStore, Scheduler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cubewatch")]
#[command(about = "Xueqiu portfolio rebalancing watcher", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 설정 파일 경로 (TOML 또는 INI)
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일보다 우선
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 스케줄러 실행 (기본값)
    Run,

    /// 한 사이클만 실행
    Once {
        /// 거래 시간 외에도 실행
        #[arg(long)]
        force: bool,
    },

    /// 처리 완료 저장소 관리
    Store {
        #[command(subcommand)]
        action: StoreCommands,
    },
}

#[derive(Subcommand)]
enum StoreCommands {
    /// 저장된 이벤트 ID 출력
    List,

    /// 이벤트 ID를 처리 완료로 기록 (알림 없이)
    Mark {
        /// 이벤트 ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;

    let mut log_config = LogConfig::from_section(&config.logging);
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    init_logging(&log_config).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!("Cube Watcher 시작");
            let poller = build_poller(&config)?;
            let scheduler = Scheduler::new(poller, TradingWindow::a_share(), config.watch.interval());

            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));

            let poller = scheduler.run(shutdown).await;
            info!(processed = poller.store().len(), "Cube Watcher 종료");
        }
        Commands::Once { force } => {
            let mut scheduler = Scheduler::new(
                build_poller(&config)?,
                TradingWindow::a_share(),
                config.watch.interval(),
            );
            if scheduler.evaluate(force).await.is_none() {
                info!("거래 시간이 아니므로 실행하지 않음 (--force로 강제 실행)");
            }
        }
        Commands::Store { action } => {
            let mut store = ProcessedEventStore::load(&config.watch.store_path);
            match action {
                StoreCommands::List => {
                    for id in store.sorted_ids() {
                        println!("{}", id);
                    }
                    info!(count = store.len(), path = %store.path().display(), "저장소 조회");
                }
                StoreCommands::Mark { id } => {
                    let id: EventId = id.parse().unwrap_or_else(|never| match never {});
                    if store.commit(id.clone())? {
                        info!(event_id = %id, "처리 완료로 기록");
                    } else {
                        info!(event_id = %id, "이미 기록된 ID");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Ctrl+C 또는 SIGTERM을 받으면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Ctrl+C 수신, 종료 중...");
        }
        _ = terminate => {
            warn!("SIGTERM 수신, 종료 중...");
        }
    }

    shutdown_token.cancel();
}
