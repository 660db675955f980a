//! MAC 队列仿真
//!
//! AP 向多个站点的多个 TID 周期性发帧，信道按固定间隔取走可发送的帧。
//! 观察生存期、队列上限、丢弃策略和 Block Ack 阻塞对丢帧的影响。

use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tcq_rs::wifi::{DropPolicy, MacScenario, run_mac_scenario};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    DropOldest,
    DropNewest,
}

impl From<PolicyArg> for DropPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::DropOldest => DropPolicy::DropOldest,
            PolicyArg::DropNewest => DropPolicy::DropNewest,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "mac_queue_sim", about = "Wi-Fi MAC 队列仿真：生存期、丢弃策略与 Block Ack 阻塞")]
struct Args {
    #[arg(long, default_value_t = 2)]
    stations: u64,
    #[arg(long, default_value_t = 2)]
    tids: u8,
    #[arg(long, default_value_t = 200)]
    frames: u64,
    #[arg(long, default_value_t = 1000)]
    frame_bytes: u32,
    /// 同一条流的帧间隔（微秒）
    #[arg(long, default_value_t = 1_000)]
    arrival_gap_us: u64,
    /// 信道每发走一帧需要的时间（微秒）
    #[arg(long, default_value_t = 2_000)]
    service_us: u64,
    /// 帧的生存期（毫秒）
    #[arg(long, default_value_t = 500)]
    lifetime_ms: u64,
    #[arg(long, default_value_t = 500)]
    max_frames: u64,
    #[arg(long, value_enum, default_value_t = PolicyArg::DropNewest)]
    drop_policy: PolicyArg,
    /// 站点 0 的 TID 0 在此之前处于阻塞状态（毫秒）；0 表示不阻塞
    #[arg(long, default_value_t = 100)]
    blocked_until_ms: u64,
    #[arg(long, default_value_t = 2_000)]
    until_ms: u64,
    /// 把事件记录写成 JSON 文件
    #[arg(long)]
    trace_json: Option<PathBuf>,
    /// 把汇总写成 JSON 文件
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let scn = MacScenario {
        stations: args.stations,
        tids: args.tids,
        frames_per_flow: args.frames,
        frame_bytes: args.frame_bytes,
        arrival_gap_us: args.arrival_gap_us,
        service_us: args.service_us,
        lifetime_ms: args.lifetime_ms,
        max_frames: args.max_frames,
        drop_policy: args.drop_policy.into(),
        blocked: (args.blocked_until_ms > 0).then_some((0, 0)),
        blocked_until_ms: args.blocked_until_ms,
        until_ms: args.until_ms,
    };

    let (report, trace) = match run_mac_scenario(&scn, args.trace_json.is_some()) {
        Ok(out) => out,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    println!(
        "generated={} sent={} expired={} overflow={} flushed={}",
        report.generated, report.sent, report.expired, report.overflow, report.flushed
    );
    for (station, sent) in &report.sent_by_station {
        println!("  station {station}: sent={sent}");
    }
    if let Some(t) = report.blocked_first_tx_ns {
        println!("  blocked flow first tx @ {t} ns");
    }

    if let (Some(path), Some(trace)) = (&args.trace_json, &trace) {
        trace.write_json(path).expect("write trace json");
        println!("wrote trace events to {}", path.display());
    }
    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&report).expect("serialize summary");
        fs::write(path, json).expect("write summary json");
    }
}
