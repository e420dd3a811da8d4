//! The single page served at `/`.
//!
//! The page holds no state of its own: it opens a form session, forwards
//! every control change as a `form.event` and redraws from the returned view.

pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Work Tracker</title>
<style>
  body { font-family: sans-serif; max-width: 42rem; margin: 2rem auto; }
  label { display: block; margin-top: .75rem; font-weight: bold; }
  .hidden { display: none; }
  #dialog { border: 1px solid #888; padding: .75rem; margin-top: 1rem; background: #f6f6f6; }
  #counts span { margin-right: 1.5rem; }
  table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
  td, th { border-bottom: 1px solid #ddd; padding: .25rem; text-align: left; }
</style>
</head>
<body>
<h1>Work Tracker</h1>
<div id="counts"><span>Total: <b id="total">0</b></span><span>In progress: <b id="inprogress">0</b></span></div>

<label for="category">Category</label>
<select id="category"></select>

<label for="subcategory">Sub-category</label>
<select id="subcategory"></select>
<input id="subsearch" placeholder="Search or add">
<button id="subadd" class="hidden">Add</button>

<label for="startdate">Start date</label>
<input id="startdate" type="date">

<label for="description">Description</label>
<textarea id="description" rows="3" cols="50"></textarea>

<label><input id="status" type="checkbox"> Complete</label>

<div id="enddatebox" class="hidden">
  <label for="enddate">End date</label>
  <input id="enddate" type="date">
</div>

<p><button id="submit">Add task</button> <button id="listtoggle">Show tasks</button></p>

<div id="dialog" class="hidden">
  <p id="dialogtext"></p>
  <button id="dialogok">OK</button>
  <button id="dialogyes" class="hidden">Yes</button>
  <button id="dialogno" class="hidden">No</button>
</div>

<table id="tasks" class="hidden">
  <thead><tr><th>Start</th><th>Category</th><th>Sub-category</th><th>Description</th><th>Status</th><th>End</th></tr></thead>
  <tbody></tbody>
</table>

<script>
let sessionId = null;
let nextId = 1;
let localError = false;
const $ = (id) => document.getElementById(id);

async function rpc(method, params) {
  const res = await fetch('/rpc', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ method, params, id: nextId++ }),
  });
  const body = await res.json();
  if (!body.success) throw new Error(body.error.message);
  return body.result;
}

async function send(event) {
  try {
    const result = await rpc('form.event', { sessionId, event });
    if (result.updated) draw(result.view);
    else if (event.type === 'dialog_dismissed' && localError) hideLocalError();
  } catch (e) {
    showError(e.message);
  }
}

async function refresh() {
  const result = await rpc('form.view', { sessionId });
  draw(result.view);
}

function showError(message) {
  localError = true;
  $('dialog').classList.remove('hidden');
  $('dialogtext').textContent = message;
  $('dialogok').classList.remove('hidden');
  $('dialogyes').classList.add('hidden');
  $('dialogno').classList.add('hidden');
}

function hideLocalError() {
  localError = false;
  $('dialog').classList.add('hidden');
}

function fillSelect(select, options, selected, withBlank) {
  select.innerHTML = '';
  if (withBlank) select.add(new Option('', ''));
  for (const o of options) select.add(new Option(o.label, o.key));
  select.value = selected ?? '';
}

function draw(v) {
  localError = false;
  fillSelect($('category'), v.categoryOptions.map((c) => ({ key: c, label: c })), v.category, false);
  fillSelect($('subcategory'), v.subCategoryOptions, v.subCategory, true);
  if (document.activeElement !== $('subsearch')) $('subsearch').value = v.subCategorySearch;
  $('subadd').classList.toggle('hidden', !v.canAddSubCategory);
  $('startdate').value = v.startDate;
  $('startdate').max = v.startDateMax;
  if (document.activeElement !== $('description')) $('description').value = v.description;
  $('status').checked = v.statusToggleChecked;
  $('enddatebox').classList.toggle('hidden', !v.endDateVisible);
  $('enddate').value = v.endDate ?? '';
  $('enddate').min = v.endDateMin ?? '';
  $('enddate').max = v.endDateMax ?? '';
  $('total').textContent = v.totalCount;
  $('inprogress').textContent = v.inProgressCount;

  const confirm = v.dialog && v.dialog.kind === 'confirm_completion';
  $('dialog').classList.toggle('hidden', !v.dialog);
  $('dialogtext').textContent = v.dialog ? v.dialog.message : '';
  $('dialogok').classList.toggle('hidden', confirm);
  $('dialogyes').classList.toggle('hidden', !confirm);
  $('dialogno').classList.toggle('hidden', !confirm);

  $('listtoggle').textContent = v.listVisible ? 'Hide tasks' : 'Show tasks';
  $('tasks').classList.toggle('hidden', !v.listVisible);
  const body = $('tasks').tBodies[0];
  body.innerHTML = '';
  for (const t of v.tasks) {
    const row = body.insertRow();
    for (const cell of [t.start_date, t.category, t.sub_category ?? '', t.task_description,
                        t.task_status === 1 ? 'Complete' : 'In progress', t.end_date ?? '']) {
      row.insertCell().textContent = cell;
    }
  }
}

$('category').onchange = (e) => send({ type: 'category_selected', category: e.target.value });
$('subcategory').onchange = (e) => send({ type: 'sub_category_selected', key: e.target.value });
$('subsearch').oninput = (e) => send({ type: 'sub_category_search_changed', text: e.target.value });
$('subadd').onclick = () => send({ type: 'sub_category_add_confirmed' });
$('startdate').onchange = (e) => e.target.value && send({ type: 'start_date_changed', date: e.target.value });
$('description').oninput = (e) => send({ type: 'description_changed', text: e.target.value });
$('status').onchange = (e) => send({ type: 'status_toggled', complete: e.target.checked });
$('enddate').onchange = (e) => e.target.value && send({ type: 'end_date_changed', date: e.target.value });
$('submit').onclick = () => send({ type: 'submitted' });
$('listtoggle').onclick = () => send({ type: 'list_toggled' });
$('dialogok').onclick = () => send({ type: 'dialog_dismissed' });
$('dialogyes').onclick = () => send({ type: 'completion_confirmed' });
$('dialogno').onclick = () => send({ type: 'completion_declined' });

function listen() {
  const ws = new WebSocket(`ws://${location.host}/ws`);
  ws.onmessage = (msg) => {
    const data = JSON.parse(msg.data);
    if (data.type === 'tasks.changed' || data.type === 'subcategory.added') refresh();
  };
  ws.onclose = () => setTimeout(listen, 2000);
}

window.addEventListener('beforeunload', () => {
  navigator.sendBeacon('/rpc', JSON.stringify({ method: 'form.close', params: { sessionId } }));
});

rpc('form.open', {}).then((result) => {
  sessionId = result.sessionId;
  draw(result.view);
  listen();
}).catch((e) => showError(e.message));
</script>
</body>
</html>
"#;
