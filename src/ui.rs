use crate::models::Dashboard;

pub fn render_index(dashboard: &Dashboard) -> String {
    INDEX_HTML
        .replace("{{PRODUCTS}}", &dashboard.product_count.to_string())
        .replace("{{STOCK}}", &dashboard.total_stock.to_string())
        .replace("{{VALUE}}", &dashboard.total_value_label)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Inventaire</title>
  <script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
  <style>
    :root {
      --bg: #f1f5f9;
      --ink: #0f172a;
      --muted: #64748b;
      --accent: #6366f1;
      --danger: #ef4444;
      --ok: #10b981;
      --card: #ffffff;
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      grid-template-columns: 220px 1fr;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
    }

    .sidebar {
      background: var(--ink);
      padding: 24px 12px;
      display: grid;
      align-content: start;
      gap: 6px;
    }

    .sidebar h1 { color: white; font-size: 1.2rem; margin: 0 12px 18px; }

    .sidebar a {
      color: #cbd5e1;
      text-decoration: none;
      padding: 10px 12px;
      border-radius: 10px;
      cursor: pointer;
    }

    .sidebar a.active { background: var(--accent); color: white; }

    .status { margin: 18px 12px 0; font-size: 0.8rem; color: #94a3b8; }
    .status.online { color: var(--ok); }
    .status.offline, .status.store_failed { color: var(--danger); }

    main { padding: 28px; display: grid; align-content: start; gap: 20px; }

    .module { display: none; gap: 20px; }
    .module.active { display: grid; }

    .card { background: var(--card); border-radius: 16px; padding: 20px; box-shadow: 0 8px 24px rgba(15, 23, 42, 0.06); }

    .kpis { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 16px; }
    .kpi .label { font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.1em; color: var(--muted); }
    .kpi .value { font-size: 1.8rem; font-weight: 600; margin-top: 6px; }

    .charts { display: grid; grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); gap: 16px; }
    .charts .card { height: 340px; }

    form { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 10px; align-items: end; }
    input, select, button { font: inherit; padding: 10px 12px; border-radius: 10px; border: 1px solid #cbd5e1; }
    button { background: var(--accent); color: white; border: none; cursor: pointer; }
    button.ghost { background: transparent; color: var(--accent); }
    button.danger { background: transparent; color: var(--danger); }

    table { width: 100%; border-collapse: collapse; }
    td, th { text-align: left; padding: 10px; border-bottom: 1px solid #e2e8f0; }
    .muted { color: var(--muted); font-size: 0.85rem; }
    .badge { padding: 2px 10px; border-radius: 999px; color: white; background: var(--ok); }
    .badge.low { background: var(--danger); }

    ul { list-style: none; margin: 0; padding: 0; }
    li { display: flex; justify-content: space-between; align-items: center; padding: 10px 0; border-bottom: 1px solid #e2e8f0; }

    .suggestions { position: relative; }
    .suggestions ul { position: absolute; z-index: 2; background: white; width: 100%; box-shadow: 0 8px 24px rgba(15, 23, 42, 0.12); border-radius: 10px; }
    .suggestions li { padding: 8px 12px; cursor: pointer; }
  </style>
</head>
<body>
  <nav class="sidebar">
    <h1>Inventaire</h1>
    <a data-view="dashboard" class="active">Tableau de bord</a>
    <a data-view="products">Produits</a>
    <a data-view="categories">Catégories</a>
    <div class="status" id="apiStatus">Catalogue : inactif</div>
  </nav>

  <main>
    <section class="module active" id="dashboard">
      <div class="kpis">
        <div class="card kpi"><div class="label">Produits</div><div class="value" id="kpiProducts">{{PRODUCTS}}</div></div>
        <div class="card kpi"><div class="label">Stock total</div><div class="value" id="kpiStock">{{STOCK}}</div></div>
        <div class="card kpi"><div class="label">Valeur</div><div class="value" id="kpiValue">{{VALUE}}</div></div>
      </div>
      <div class="charts">
        <div class="card"><canvas id="pieChart"></canvas></div>
        <div class="card"><canvas id="barChart"></canvas></div>
      </div>
    </section>

    <section class="module" id="products">
      <div class="card">
        <form id="productForm" autocomplete="off">
          <input type="hidden" id="pid" />
          <div class="suggestions">
            <input id="pname" placeholder="Nom" required />
            <ul id="suggestList"></ul>
          </div>
          <input id="pprice" placeholder="Prix" inputmode="decimal" />
          <input id="pqty" placeholder="Quantité" inputmode="numeric" />
          <select id="pcat"></select>
          <button type="submit">Enregistrer</button>
        </form>
      </div>
      <div class="card">
        <form id="searchForm">
          <input id="search" placeholder="Rechercher un produit" />
          <label class="muted"><input type="checkbox" id="sortByName" /> Trier par nom</label>
        </form>
        <table>
          <thead><tr><th>Produit</th><th>Prix</th><th>Qté</th><th></th></tr></thead>
          <tbody id="productList"></tbody>
        </table>
      </div>
    </section>

    <section class="module" id="categories">
      <div class="card">
        <form id="categoryForm">
          <input id="catName" placeholder="Nouvelle catégorie" />
          <button type="submit">Ajouter</button>
        </form>
      </div>
      <div class="card"><ul id="catList"></ul></div>
    </section>

    <section class="module" id="product_detail">
      <div class="card" id="detail"></div>
    </section>
  </main>

  <script>
    const tab = sessionStorage.getItem('tab') || (crypto.randomUUID ? crypto.randomUUID() : String(Date.now()));
    sessionStorage.setItem('tab', tab);
    const charts = {};
    const $ = (id) => document.getElementById(id);
    const esc = (text) => String(text).replace(/[&<>"']/g, (c) => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
    const palette = ['#6366f1', '#10b981', '#f59e0b', '#ef4444', '#8b5cf6', '#06b6d4'];

    const api = async (method, path, body) => {
      const sep = path.includes('?') ? '&' : '?';
      const res = await fetch(`${path}${sep}tab=${encodeURIComponent(tab)}`, {
        method,
        headers: body ? { 'content-type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined
      });
      if (!res.ok) {
        const failure = await res.json().catch(() => ({}));
        throw new Error(failure.error || res.statusText);
      }
      return res.json();
    };

    const showModule = (id) => {
      document.querySelectorAll('.module').forEach((m) => m.classList.toggle('active', m.id === id));
      document.querySelectorAll('.sidebar a').forEach((a) => a.classList.toggle('active', a.dataset.view === id));
    };

    const drawChart = (frame) => {
      if (charts[frame.canvas]) {
        charts[frame.canvas].chart.destroy();
      }
      const doughnut = frame.series.kind === 'doughnut';
      const chart = new Chart($(frame.canvas).getContext('2d'), {
        type: frame.series.kind,
        data: {
          labels: frame.series.labels,
          datasets: [{
            label: 'Quantité en stock',
            data: frame.series.values,
            backgroundColor: doughnut ? palette : palette[0],
            borderWidth: 0,
            borderRadius: doughnut ? 0 : 8
          }]
        },
        options: {
          responsive: true,
          maintainAspectRatio: false,
          cutout: doughnut ? '65%' : undefined,
          plugins: { legend: doughnut ? { position: 'bottom' } : { display: false } },
          scales: doughnut ? {} : { y: { beginAtZero: true } }
        }
      });
      charts[frame.canvas] = { generation: frame.generation, chart };
    };

    const renderStatus = (status) => {
      const badge = $('apiStatus');
      badge.className = `status ${status.state}`;
      badge.textContent = {
        idle: 'Catalogue : inactif',
        syncing: 'Catalogue : synchronisation…',
        online: `Catalogue : ${status.entries} articles`,
        offline: 'Catalogue : hors ligne',
        store_failed: 'Catalogue : enregistrement impossible'
      }[status.state] || '';
    };

    const render = (view) => {
      $('kpiProducts').textContent = view.dashboard.product_count;
      $('kpiStock').textContent = view.dashboard.total_stock;
      $('kpiValue').textContent = view.dashboard.total_value_label;
      if (window.Chart) {
        view.charts.forEach((frame) => {
          if (!charts[frame.canvas] || charts[frame.canvas].generation !== frame.generation) {
            drawChart(frame);
          }
        });
      }

      const selected = $('pcat').value;
      $('pcat').innerHTML = view.categories.options.map((c) => `<option value="${esc(c)}">${esc(c)}</option>`).join('');
      if (view.categories.options.includes(selected)) {
        $('pcat').value = selected;
      }
      $('catList').innerHTML = view.categories.items.map((item) => `
        <li><span>${esc(item.label)} <span class="muted">(${item.product_count})</span></span>
        <button class="danger" data-del-cat="${item.index}">Supprimer</button></li>`).join('');

      $('productList').innerHTML = view.products.map((p) => `
        <tr>
          <td><a class="ghost" data-detail="${p.id}"><strong>${esc(p.name)}</strong></a><div class="muted">${esc(p.category)}</div></td>
          <td>${esc(p.price_label)}</td>
          <td><span class="badge ${p.low_stock ? 'low' : ''}">${p.qty}</span></td>
          <td>
            <button class="ghost" data-edit="${p.id}">Modifier</button>
            <button class="danger" data-del="${p.id}">Supprimer</button>
          </td>
        </tr>`).join('');

      renderStatus(view.catalog);
      const active = view.active.view;
      if (active !== 'product_detail') {
        showModule(active);
      }
    };

    const refresh = async () => {
      const filter = encodeURIComponent($('search').value);
      const sort = $('sortByName').checked;
      render(await api('GET', `/api/view?filter=${filter}&sort=${sort}`));
    };

    const fillForm = (form) => {
      $('pid').value = form.id || '';
      $('pname').value = form.name;
      $('pprice').value = form.price;
      $('pqty').value = form.qty;
      $('pcat').value = form.category;
    };

    const report = (err) => console.error(err);

    document.querySelectorAll('.sidebar a').forEach((link) => {
      link.addEventListener('click', () => {
        api('POST', '/api/navigate', { view: link.dataset.view }).then(render).catch(report);
      });
    });

    $('productForm').addEventListener('submit', (event) => {
      event.preventDefault();
      const form = {
        id: $('pid').value || null,
        name: $('pname').value,
        price: $('pprice').value,
        qty: $('pqty').value,
        category: $('pcat').value
      };
      api('POST', '/api/products', form).then((res) => {
        event.target.reset();
        $('pid').value = '';
        $('search').value = '';
        render(res.view);
      }).catch(report);
    });

    $('categoryForm').addEventListener('submit', (event) => {
      event.preventDefault();
      api('POST', '/api/categories', { name: $('catName').value }).then((res) => {
        if (res.applied) {
          $('catName').value = '';
        }
        render(res.view);
      }).catch(report);
    });

    $('productList').addEventListener('click', (event) => {
      const target = event.target.closest('[data-edit],[data-del],[data-detail]');
      if (!target) return;
      if (target.dataset.edit) {
        api('GET', `/api/products/${target.dataset.edit}/edit`).then((res) => {
          fillForm(res.form);
          render(res.view);
        }).catch(report);
      } else if (target.dataset.del) {
        const confirmed = confirm('Supprimer ce produit ?');
        api('DELETE', `/api/products/${target.dataset.del}?confirmed=${confirmed}`).then((res) => render(res.view)).catch(report);
      } else {
        api('GET', `/api/products/${target.dataset.detail}`).then((d) => {
          $('detail').innerHTML = `
            <h2>${esc(d.name)}</h2>
            <p class="muted">${esc(d.category)}</p>
            <p>Prix : ${esc(d.price_label)}</p>
            <p>Quantité : <span class="badge ${d.low_stock ? 'low' : ''}">${d.qty}</span></p>
            <p>Valeur du stock : ${esc(d.stock_value_label)} (${d.share_of_stock}% du stock)</p>
            <button class="ghost" data-back>Retour</button>`;
          showModule('product_detail');
        }).catch(report);
      }
    });

    $('detail').addEventListener('click', (event) => {
      if (event.target.closest('[data-back]')) {
        api('POST', '/api/navigate', { view: 'products' }).then(render).catch(report);
      }
    });

    $('catList').addEventListener('click', (event) => {
      const target = event.target.closest('[data-del-cat]');
      if (!target) return;
      const confirmed = confirm('Supprimer cette catégorie ?');
      api('DELETE', `/api/categories/${target.dataset.delCat}?confirmed=${confirmed}`).then((res) => render(res.view)).catch(report);
    });

    $('search').addEventListener('input', () => refresh().catch(report));
    $('sortByName').addEventListener('change', () => refresh().catch(report));
    $('searchForm').addEventListener('submit', (event) => event.preventDefault());

    $('pname').addEventListener('input', async () => {
      const list = $('suggestList');
      const q = $('pname').value;
      if ($('pid').value || q.trim().length < 2) {
        list.innerHTML = '';
        return;
      }
      const entries = await api('GET', `/api/catalog/suggest?q=${encodeURIComponent(q)}`).catch(() => []);
      list.innerHTML = entries.slice(0, 8).map((e, i) => `<li data-pick="${i}">${esc(e.title)} <span class="muted">${esc(e.category)}</span></li>`).join('');
      list.onclick = (event) => {
        const item = event.target.closest('[data-pick]');
        if (!item) return;
        list.innerHTML = '';
        api('POST', '/api/catalog/select', entries[Number(item.dataset.pick)]).then((res) => {
          render(res.view);
          fillForm(res.form);
        }).catch(report);
      };
    });

    refresh().catch(report);
    setInterval(() => {
      if (!document.hidden) refresh().catch(report);
    }, 5000);
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{ChartScale, build_dashboard};

    #[test]
    fn index_carries_current_kpis() {
        let dashboard = build_dashboard(&[], ChartScale::Quantity);
        let html = render_index(&dashboard);
        assert!(html.contains(r#"id="kpiProducts">0<"#));
        assert!(html.contains(r#"id="kpiValue">0.00 €<"#));
        assert!(!html.contains("{{"));
    }
}
