use async_trait::async_trait;
use clap::Parser;
use color_eyre::Result;
use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, Event, KeyCode, KeyEventKind, poll},
    layout::{Constraint, Layout},
    style::Stylize,
    text::Line,
    widgets::{Bar, BarChart, BarGroup},
};
use sqlqueue::{Dialect, Queue, QueueConfig, Request, RequestHandler, Response, ResponseDeliverer};
use sqlx::PgPool;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Parser)]
struct Args {
    #[clap(long, env = "DATABASE_URL")]
    database_url: String,
    #[clap(long, default_value = "test.test_task")]
    table: String,
    #[clap(default_value_t = 90)]
    fast_workers: usize,
    #[clap(default_value_t = 5)]
    slow_workers: usize,
}

const POLL_TIME: Duration = Duration::from_millis(250);
const STATE_REFRESH_PERIOD: Duration = Duration::from_millis(500);

/// Handler that just echoes the request payload back as the response.
struct DemoHandler;

#[async_trait]
impl RequestHandler for DemoHandler {
    async fn compute_response(
        &self,
        request: &Request,
        _txn: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> anyhow::Result<Response> {
        Ok(Response::new(0, request.data.clone()))
    }
}

/// Deliverer that discards the response; the demo only cares about the
/// resulting row-state counts.
struct DemoDeliverer;

#[async_trait]
impl ResponseDeliverer for DemoDeliverer {
    async fn deliver_response(&self, _request_id: i64, _response: &Response) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Per-state row counts, refreshed by [`poll_row_counts`] and read by the
/// terminal thread on every redraw.
#[derive(Default)]
struct RowCounts {
    new: AtomicU32,
    handled: AtomicU32,
    notified: AtomicU32,
}

/// One simulated producer/worker: enqueues a request, handles it, and
/// delivers it in a loop, sleeping a random amount between cycles drawn
/// from `sleep_range`.
async fn queue_worker(queue: Queue, next_id: Arc<AtomicI64>, sleep_range: Range<u64>) -> Result<()> {
    loop {
        let sleep_value = rand::random_range(sleep_range.clone());
        let id = next_id.fetch_add(1, Ordering::Relaxed);

        queue
            .add(&[Request::new(id, format!("payload{id}").into_bytes())], false)
            .await?;
        queue.handle().await?;
        queue.respond().await?;

        tokio::time::sleep(Duration::from_millis(sleep_value)).await;
    }
}

/// Background task that periodically re-derives the three row-state counts
/// via the queue's own inspection queries and publishes them into `counts`.
async fn poll_row_counts(queue: Queue, counts: Arc<RowCounts>, should_exit: Arc<AtomicBool>) -> Result<()> {
    while !should_exit.load(Ordering::Relaxed) {
        let new = queue.not_handled_request_ids().await?.len() as u32;
        let handled = queue.not_notified_request_ids().await?.len() as u32;
        let notified = queue.notified_request_ids().await?.len() as u32;

        counts.new.store(new, Ordering::Relaxed);
        counts.handled.store(handled, Ordering::Relaxed);
        counts.notified.store(notified, Ordering::Relaxed);

        tokio::time::sleep(STATE_REFRESH_PERIOD).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    color_eyre::install()?;

    let res = run_app(args).await;
    ratatui::restore();
    res
}

async fn run_app(args: Args) -> Result<()> {
    let pool = PgPool::connect(&args.database_url).await?;
    let config = QueueConfig::new(args.table, Dialect::PostgreSql)
        .with_fetch_for_handling_limit(1)
        .with_fetch_for_notification_limit(1);
    let queue = Queue::new(pool, config, Arc::new(DemoHandler), Arc::new(DemoDeliverer));

    let next_id = Arc::new(AtomicI64::new(0));
    let counts = Arc::new(RowCounts::default());

    let mut tasks = JoinSet::new();

    for _ in 0..args.fast_workers {
        tasks.spawn(queue_worker(queue.clone(), next_id.clone(), 100..2_000));
    }
    for _ in 0..args.slow_workers {
        tasks.spawn(queue_worker(queue.clone(), next_id.clone(), 10_000..15_000));
    }

    let should_exit = Arc::new(AtomicBool::new(false));
    tasks.spawn(poll_row_counts(queue.clone(), counts.clone(), should_exit.clone()));

    let should_exit_clone = should_exit.clone();
    let terminal_app =
        tokio::task::spawn_blocking(move || run_terminal_app(&counts, should_exit_clone.clone()));

    tokio::select! {
        res = terminal_app => {
            should_exit.store(true, Ordering::SeqCst);
            return res?
        },

        res = tasks.join_next() => {
            if let Some(res) = res {
                should_exit.store(true, Ordering::SeqCst);
                return res??;
            }
        }
    }

    Ok(())
}

fn run_terminal_app(counts: &RowCounts, should_exit: Arc<AtomicBool>) -> Result<()> {
    let terminal = ratatui::init();
    let app_result = App::new(counts, &should_exit).run(terminal);
    ratatui::restore();
    app_result
}

struct App<'a> {
    should_exit: &'a AtomicBool,
    counts: &'a RowCounts,
}

impl<'a> App<'a> {
    fn new(counts: &'a RowCounts, should_exit: &'a AtomicBool) -> Self {
        Self { should_exit, counts }
    }

    fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_exit.load(Ordering::Relaxed) {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn handle_events(&mut self) -> Result<()> {
        if poll(POLL_TIME)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && key.code == KeyCode::Char('q')
        {
            self.should_exit.store(true, Ordering::Relaxed);
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let [title, vertical] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)])
            .spacing(1)
            .areas(frame.area());

        frame.render_widget("Rows By State".bold().into_centered_line(), title);

        let bars = [
            labeled_bar("NEW", self.counts.new.load(Ordering::Relaxed)),
            labeled_bar("HANDLED", self.counts.handled.load(Ordering::Relaxed)),
            labeled_bar("NOTIFIED", self.counts.notified.load(Ordering::Relaxed)),
        ];
        let chart = BarChart::default()
            .data(BarGroup::default().bars(&bars))
            .bar_width(10)
            .bar_gap(3);
        frame.render_widget(chart, vertical);
    }
}

fn labeled_bar(label: &'static str, value: u32) -> Bar<'static> {
    Bar::default()
        .value(value as u64)
        .text_value(value.to_string())
        .label(Line::from(label))
}
