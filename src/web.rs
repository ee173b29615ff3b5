use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use log::{error, info};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::feed::{FeedCache, LogEntry};
use crate::history::{ChartSeries, DailyAggregate, Filter};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<FeedCache>,
    pub client: reqwest::Client,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

// The feed is an upstream collaborator, so its failures surface as 502.
fn bad_gateway<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!("feed request failed: {:#}", e);
    (StatusCode::BAD_GATEWAY, e.to_string())
}

pub async fn serve(feed_url: String, bind: SocketAddr) -> anyhow::Result<()> {
    let state = AppState {
        cache: Arc::new(FeedCache::new(feed_url)),
        client: reqwest::Client::new(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index))
        .route("/api/logs", get(logs))
        .route("/api/history", get(history))
        .layer(cors)
        .with_state(state);

    info!("Listening on http://{}", bind);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Raw list view. Always re-fetches upstream so repeated visits to the
/// history panel show the latest feed.
async fn logs(State(st): State<AppState>) -> ApiResult<Vec<LogEntry>> {
    let entries = st.cache.refresh(&st.client).await.map_err(bad_gateway)?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    range: Option<usize>,
    month: Option<String>,
}

/// Chart series. Served from the cached snapshot: the first call fetches
/// the feed, every later call (filter changes included) re-derives from
/// the same aggregate without touching upstream.
async fn history(
    State(st): State<AppState>,
    Query(q): Query<HistoryParams>,
) -> ApiResult<ChartSeries> {
    let entries = st.cache.snapshot(&st.client).await.map_err(bad_gateway)?;
    let aggregate = DailyAggregate::from_entries(&entries);
    let filter = Filter::parse(q.range, q.month.as_deref());
    Ok(Json(aggregate.series(filter)))
}

const INDEX_HTML: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Feeder Dashboard</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"></script>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: linear-gradient(135deg, #43cea2 0%, #185a9d 100%);
            min-height: 100vh;
            padding: 20px;
        }
        .container { max-width: 1100px; margin: 0 auto; }
        h1 {
            color: white;
            font-size: 2.2rem;
            margin-bottom: 10px;
            text-shadow: 2px 2px 4px rgba(0,0,0,0.2);
        }
        .subtitle {
            color: rgba(255,255,255,0.9);
            font-size: 1.05rem;
            margin-bottom: 20px;
        }
        nav { margin-bottom: 25px; }
        nav button, .controls button {
            background: white;
            border: none;
            border-radius: 6px;
            padding: 8px 16px;
            margin-right: 8px;
            font-size: 0.95rem;
            cursor: pointer;
            color: #185a9d;
            font-weight: 600;
        }
        nav button:hover, .controls button:hover { background: #e8f4f1; }
        .card {
            background: white;
            padding: 25px;
            border-radius: 12px;
            box-shadow: 0 10px 30px rgba(0,0,0,0.2);
            margin-bottom: 20px;
        }
        .card h2 {
            margin: 0 0 20px 0;
            font-size: 1.3rem;
            color: #333;
            border-bottom: 3px solid #43cea2;
            padding-bottom: 10px;
        }
        .chart-container {
            position: relative;
            height: 320px;
            margin-top: 10px;
        }
        .controls {
            display: flex;
            align-items: center;
            margin-bottom: 15px;
        }
        .controls select {
            padding: 8px;
            border-radius: 6px;
            border: 1px solid #ccc;
            font-size: 0.95rem;
        }
        #event-log {
            list-style: none;
            padding: 0;
            max-height: 350px;
            overflow-y: auto;
        }
        #event-log li {
            padding: 10px 12px;
            margin-bottom: 6px;
            background: #f8f9fa;
            border-radius: 6px;
            border-left: 4px solid #43cea2;
            color: #333;
            font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
            font-size: 0.9rem;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Feeder Dashboard</h1>
        <p class="subtitle">Feeding activity from the live log feed</p>

        <nav>
            <button onclick="showSection('home-section')">Home</button>
            <button onclick="showSection('history-section')">History</button>
        </nav>

        <div id="home-section" class="dashboard-section">
            <div class="card">
                <h2>Welcome</h2>
                <p>Open the History panel to load the event log and the
                daily feeding chart. The list refreshes on every visit;
                the chart is built once and filtered in place.</p>
            </div>
        </div>

        <div id="history-section" class="dashboard-section" style="display: none;">
            <div class="card">
                <h2>Daily Activity</h2>
                <div class="controls">
                    <button id="btn7">Last 7</button>
                    <button id="btn30">Last 30</button>
                    <button id="btnAll">All</button>
                    <select id="monthSelect">
                        <option value="all">All months</option>
                        <option value="0">January</option>
                        <option value="1">February</option>
                        <option value="2">March</option>
                        <option value="3">April</option>
                        <option value="4">May</option>
                        <option value="5">June</option>
                        <option value="6">July</option>
                        <option value="7">August</option>
                        <option value="8">September</option>
                        <option value="9">October</option>
                        <option value="10">November</option>
                        <option value="11">December</option>
                    </select>
                </div>
                <div class="chart-container">
                    <canvas id="historyChart"></canvas>
                </div>
            </div>

            <div class="card">
                <h2>Event Log</h2>
                <ul id="event-log"></ul>
            </div>
        </div>
    </div>

    <script>
        // Dashboard controller state; owns the built-once chart marker.
        const dash = { chartLoaded: false, chart: null };

        function showSection(id) {
            document.querySelectorAll('.dashboard-section').forEach(section => {
                section.style.display = (section.id === id) ? 'block' : 'none';
            });

            if (id === 'history-section') {
                loadLogs();
                if (!dash.chartLoaded) {
                    buildHistoryChart();
                    dash.chartLoaded = true;
                }
            }
        }

        async function loadLogs() {
            try {
                const res = await fetch('/api/logs');
                if (!res.ok) throw new Error('logs returned ' + res.status);
                const logs = await res.json();

                const list = document.getElementById('event-log');
                list.innerHTML = '';
                logs.forEach(entry => {
                    const li = document.createElement('li');
                    li.textContent = `${entry.timestamp} → ${entry.event}`;
                    list.appendChild(li);
                });
            } catch (e) {
                console.error('Failed to load logs:', e);
            }
        }

        async function fetchSeries(params) {
            const qs = params ? '?' + params : '';
            const res = await fetch('/api/history' + qs);
            if (!res.ok) throw new Error('history returned ' + res.status);
            return res.json();
        }

        async function buildHistoryChart() {
            try {
                const series = await fetchSeries('');
                const ctx = document.getElementById('historyChart').getContext('2d');

                dash.chart = new Chart(ctx, {
                    type: 'bar',
                    data: {
                        labels: series.labels,
                        datasets: [
                            {
                                label: 'Hungry Detected',
                                data: series.hungry,
                                backgroundColor: 'rgba(255,205,86,0.7)'
                            },
                            {
                                label: 'Auto Feeder Triggered',
                                data: series.feeder,
                                backgroundColor: 'rgba(54,162,235,0.7)'
                            }
                        ]
                    },
                    options: {
                        responsive: true,
                        maintainAspectRatio: false,
                        scales: { y: { beginAtZero: true } }
                    }
                });

                const applyFilter = async params => {
                    try {
                        const filtered = await fetchSeries(params);
                        dash.chart.data.labels = filtered.labels;
                        dash.chart.data.datasets[0].data = filtered.hungry;
                        dash.chart.data.datasets[1].data = filtered.feeder;
                        dash.chart.update();
                    } catch (e) {
                        console.error('Failed to apply filter:', e);
                    }
                };

                document.getElementById('btn7').addEventListener('click', () => applyFilter('range=7'));
                document.getElementById('btn30').addEventListener('click', () => applyFilter('range=30'));
                document.getElementById('btnAll').addEventListener('click', () => applyFilter(''));
                document.getElementById('monthSelect').addEventListener('change', ev => {
                    applyFilter('month=' + ev.target.value);
                });
            } catch (e) {
                console.error('Failed to build history chart:', e);
            }
        }

        showSection('home-section');
    </script>
</body>
</html>
"#;
