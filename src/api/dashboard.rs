// src/api/dashboard.rs
// Single-page HTML dashboard. All data comes from the JSON API; the page
// re-queries on every input change and can subscribe to the WebSocket feed.

use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>RSI-Adjusted Support/Resistance Advisor</title>
    <style>
        body { font-family: 'Segoe UI', Arial, sans-serif; margin: 0; background: #f4f6fa; color: #222; }
        .layout { display: grid; grid-template-columns: 280px 1fr; min-height: 100vh; }
        aside { background: #fff; padding: 20px; border-right: 1px solid #e3e6ee; }
        main { padding: 24px; max-width: 1280px; }
        label { display: block; font-size: 0.85em; color: #555; margin-top: 12px; }
        select, input[type=text], input[type=number] { width: 100%; padding: 6px; margin-top: 4px; box-sizing: border-box; }
        .card { background: #fff; border-radius: 10px; padding: 16px 20px; margin: 14px 0; box-shadow: 0 2px 10px rgba(0,0,0,0.06); }
        .action { font-size: 1.6em; font-weight: bold; padding: 14px 20px; border-radius: 10px; }
        .BUY { background: #d4edda; color: #155724; }
        .SELL { background: #f8d7da; color: #721c24; }
        .WAIT { background: #fff3cd; color: #856404; }
        .metrics { display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px; }
        .metric { background: #fff; border-radius: 10px; padding: 14px; box-shadow: 0 2px 10px rgba(0,0,0,0.06); }
        .metric .value { font-size: 1.4em; font-weight: bold; font-family: 'Courier New', monospace; }
        .metric .label { font-size: 0.85em; color: #666; }
        table { width: 100%; border-collapse: collapse; font-size: 0.9em; }
        th { background: #eef1f7; text-align: right; padding: 6px 8px; }
        td { text-align: right; padding: 5px 8px; border-bottom: 1px solid #eee; font-family: 'Courier New', monospace; }
        th:first-child, td:first-child { text-align: left; }
        .debug { font-family: 'Courier New', monospace; font-size: 0.85em; color: #555; }
        .error { background: #f8d7da; color: #721c24; border-radius: 10px; padding: 14px 20px; }
        .muted { color: #777; font-size: 0.9em; }
        img.chart { width: 100%; border-radius: 10px; background: #fff; }
        button { margin-top: 16px; width: 100%; padding: 8px; border: 1px solid #c8cdd8; border-radius: 6px; background: #eef1f7; cursor: pointer; }
        @media (max-width: 900px) {
            .layout { grid-template-columns: 1fr; }
            .metrics { grid-template-columns: repeat(2, 1fr); }
        }
    </style>
</head>
<body>
<div class="layout">
    <aside>
        <h3>Settings</h3>
        <label>Asset directory
            <select id="asset"><option value="">— custom —</option></select>
        </label>
        <label>Ticker
            <input id="ticker" type="text" value="AAPL">
        </label>
        <label>Period <select id="period"></select></label>
        <label>Interval <select id="interval"></select></label>
        <label><input id="autofix" type="checkbox" checked> Auto-fix period/interval if no data</label>
        <label>RSI period <input id="rsi_period" type="number"></label>
        <label>Lookback (bars) <input id="lookback" type="number"></label>
        <label>Smoothing (bars) <input id="smooth" type="number"></label>
        <label><input id="live" type="checkbox"> Live updates</label>
        <button id="clear-cache" type="button">Clear cache</button>
        <p class="muted" id="status"></p>
    </aside>
    <main>
        <h1>RSI-Adjusted Support/Resistance Advisor</h1>

        <div class="card">
            <h3>Data fetch debug</h3>
            <div class="debug" id="attempts"></div>
        </div>

        <div id="error" class="error" style="display:none"></div>

        <div id="result" style="display:none">
            <div id="action" class="action"></div>
            <p id="bias"></p>

            <div class="metrics">
                <div class="metric"><div class="value" id="m-buy"></div><div class="label">Suggested Buy Level</div></div>
                <div class="metric"><div class="value" id="m-sell"></div><div class="label">Suggested Sell Level</div></div>
                <div class="metric"><div class="value" id="m-close"></div><div class="label">Last Close</div></div>
                <div class="metric"><div class="value" id="m-rsi"></div><div class="label">RSI</div></div>
            </div>

            <details class="card">
                <summary>More Levels</summary>
                <table>
                    <tr><td>Smoothed midline</td><td id="l-mid"></td></tr>
                    <tr><td>Base support</td><td id="l-bs"></td></tr>
                    <tr><td>Base resistance</td><td id="l-br"></td></tr>
                    <tr><td>Base range</td><td id="l-range"></td></tr>
                    <tr><td>Adjusted support</td><td id="l-as"></td></tr>
                    <tr><td>Adjusted resistance</td><td id="l-ar"></td></tr>
                </table>
            </details>

            <div class="card">
                <img class="chart" id="chart" alt="chart">
            </div>

            <div class="card">
                <h3>Recent Signals &amp; Levels</h3>
                <table>
                    <thead><tr>
                        <th>Time</th><th>Close</th><th>RSI</th><th>Support</th><th>Resistance</th><th>Midline</th><th>Buy</th><th>Sell</th>
                    </tr></thead>
                    <tbody id="recent"></tbody>
                </table>
            </div>
        </div>

        <div class="card muted">
            <h3>Tips</h3>
            <ul>
                <li>Intraday intervals only reach back a limited time: 1m about 7 days, 5m–30m about 60 days, 1h about 2 years.</li>
                <li>With auto-fix on, combinations that return nothing are retried with known-good ones; the debug list shows what was tried.</li>
                <li>Buy fires when the close crosses above smoothed support with rising RSI; sell is the mirror at resistance.</li>
                <li>Aggressive traders: 5m interval. Conservative traders: 1h or higher.</li>
                <li>Levels widen as RSI moves away from 50. Use larger lookback on higher timeframes for steadier levels.</li>
            </ul>
        </div>
    </main>
</div>
<script>
const $ = (id) => document.getElementById(id);
const fmt = (v) => (v === null || v === undefined) ? '—' : Number(v).toFixed(4);
const fmtTime = (ts) => new Date(ts * 1000).toISOString().replace('T', ' ').slice(0, 16);
let socket = null;
let timer = null;

function params() {
    const p = new URLSearchParams();
    p.set('ticker', $('ticker').value.trim() || 'AAPL');
    p.set('period', $('period').value);
    p.set('interval', $('interval').value);
    p.set('autofix', $('autofix').checked ? 'true' : 'false');
    for (const k of ['rsi_period', 'lookback', 'smooth']) {
        if ($(k).value) p.set(k, $(k).value);
    }
    return p;
}

function showAttempts(attempts) {
    const box = $('attempts');
    box.replaceChildren();
    for (const a of attempts || []) {
        const line = document.createElement('div');
        line.textContent = `Tried Period=${a.period}, Interval=${a.interval} → Rows=${a.rows}` + (a.error ? ` (${a.error})` : '');
        box.appendChild(line);
    }
}

function showError(body) {
    showAttempts(body.attempts);
    $('result').style.display = 'none';
    $('error').style.display = 'block';
    $('error').textContent = body.error || 'Request failed';
}

function showReport(r) {
    const rec = r.recommendation;
    showAttempts(r.attempts);
    $('error').style.display = 'none';
    $('result').style.display = 'block';
    $('action').className = 'action ' + rec.action;
    $('action').textContent = rec.headline;
    $('bias').textContent = rec.bias_note + (r.autofixed ? ` (auto-fixed to ${r.period} / ${r.interval})` : '');
    $('m-buy').textContent = fmt(rec.buy_level);
    $('m-sell').textContent = fmt(rec.sell_level);
    $('m-close').textContent = fmt(rec.close);
    $('m-rsi').textContent = Number(rec.rsi).toFixed(2) + ' ' + rec.rsi_zone;
    $('l-mid').textContent = fmt(rec.midline);
    $('l-bs').textContent = fmt(rec.base_support);
    $('l-br').textContent = fmt(rec.base_resistance);
    $('l-range').textContent = fmt(rec.range);
    $('l-as').textContent = fmt(rec.adj_support);
    $('l-ar').textContent = fmt(rec.adj_resistance);
    $('recent').innerHTML = r.recent.slice().reverse().map(row => `<tr>
        <td>${fmtTime(row.timestamp)}</td><td>${fmt(row.close)}</td><td>${Number(row.rsi).toFixed(2)}</td>
        <td>${fmt(row.smooth_support)}</td><td>${fmt(row.smooth_resistance)}</td><td>${fmt(row.smooth_midline)}</td>
        <td>${row.buy_signal ? '▲' : ''}</td><td>${row.sell_signal ? '▼' : ''}</td></tr>`).join('');
    $('chart').src = '/api/v1/chart.svg?' + params().toString() + '&_=' + Date.now();
    $('status').textContent = `${r.total_rows} bars, ${r.valid_rows} valid` + (r.cached ? ' (cached)' : '') + ` · ${r.created_at}`;
}

async function refresh() {
    $('status').textContent = 'Loading…';
    try {
        const resp = await fetch('/api/v1/analysis?' + params().toString());
        const body = await resp.json();
        if (resp.ok) { showReport(body); } else { showError(body); $('status').textContent = ''; }
    } catch (e) {
        showError({ error: String(e) });
    }
}

async function clearCache() {
    $('status').textContent = 'Clearing cache…';
    try {
        await fetch('/api/v1/cache/clear', { method: 'POST' });
    } catch (e) {
        $('status').textContent = String(e);
        return;
    }
    refresh();
}

function connectLive() {
    if (socket) { socket.close(); socket = null; }
    if (!$('live').checked) return;
    const proto = location.protocol === 'https:' ? 'wss' : 'ws';
    socket = new WebSocket(`${proto}://${location.host}/api/v1/ws?` + params().toString());
    socket.onmessage = (ev) => {
        const msg = JSON.parse(ev.data);
        if (msg.type === 'report') showReport(msg.report); else showError(msg);
    };
    socket.onclose = () => { socket = null; };
}

function changed() {
    clearTimeout(timer);
    timer = setTimeout(() => { if ($('live').checked) connectLive(); else refresh(); }, 250);
}

async function init() {
    const [assets, options] = await Promise.all([
        fetch('/api/v1/assets').then(r => r.json()),
        fetch('/api/v1/options').then(r => r.json()),
    ]);
    for (const a of assets) $('asset').add(new Option(a.label, a.ticker));
    for (const p of options.periods) $('period').add(new Option(p, p));
    for (const i of options.intervals) $('interval').add(new Option(i, i));
    const d = options.defaults;
    $('ticker').value = d.ticker;
    $('asset').value = assets.some(a => a.ticker === d.ticker) ? d.ticker : '';
    $('period').value = d.period;
    $('interval').value = d.interval;
    $('autofix').checked = d.autofix;
    for (const [id, key] of [['rsi_period', 'rsi_period'], ['lookback', 'lookback'], ['smooth', 'smooth']]) {
        $(id).value = d[id === 'smooth' ? 'smooth_length' : id];
        $(id).min = options[key].min;
        $(id).max = options[key].max;
    }
    $('asset').addEventListener('change', () => { if ($('asset').value) { $('ticker').value = $('asset').value; } changed(); });
    for (const id of ['ticker', 'period', 'interval', 'autofix', 'rsi_period', 'lookback', 'smooth']) {
        $(id).addEventListener('change', changed);
    }
    $('live').addEventListener('change', () => { connectLive(); if (!$('live').checked) refresh(); });
    $('clear-cache').addEventListener('click', clearCache);
    refresh();
}

init();
</script>
</body>
</html>
"##;
