//! Embedded single-page HTML frontend.
//!
//! One text input, one Search button, a spinner while the agent works, and
//! a success, warning or failure panel afterwards.  The result is inserted as
//! text, never as HTML.

/// The complete HTML frontend as a static string.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Airbnb Search with MCP</title>
<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
:root{
  --bg:#1a1a2e;
  --bg-secondary:#16213e;
  --bg-input:#0f3460;
  --text:#e4e4e4;
  --text-muted:#8a8a9a;
  --accent:#e94560;
  --accent-hover:#ff6b81;
  --border:#2a2a4a;
  --success:#4ecca3;
  --warning:#f0a500;
}
html,body{min-height:100%;font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,Helvetica,Arial,sans-serif;background:var(--bg);color:var(--text)}
main{max-width:720px;margin:0 auto;padding:48px 20px}
h1{font-size:28px;font-weight:600;margin-bottom:28px}
label{display:block;font-size:14px;color:var(--text-muted);margin-bottom:8px}
.row{display:flex;gap:10px}
input{
  flex:1;padding:12px 14px;border-radius:8px;border:1px solid var(--border);
  background:var(--bg-input);color:var(--text);font-size:15px;outline:none;
}
input:focus{border-color:var(--accent)}
button{
  padding:12px 22px;border:none;border-radius:8px;background:var(--accent);
  color:#fff;font-size:15px;font-weight:600;cursor:pointer;
}
button:hover{background:var(--accent-hover)}
button:disabled{opacity:.5;cursor:not-allowed}

.spinner-row{display:none;align-items:center;gap:10px;margin-top:24px;color:var(--text-muted)}
.spinner-row.active{display:flex}
.spinner{
  width:16px;height:16px;border:2px solid var(--border);
  border-top-color:var(--accent);border-radius:50%;
  animation:spin .8s linear infinite;
}
@keyframes spin{to{transform:rotate(360deg)}}

.banner{display:none;margin-top:24px;padding:12px 16px;border-radius:8px;font-size:14px}
.banner.visible{display:block}
.banner.success{background:rgba(78,204,163,.12);border:1px solid var(--success);color:var(--success)}
.banner.warning{background:rgba(240,165,0,.12);border:1px solid var(--warning);color:var(--warning)}
.banner.failed{background:rgba(233,69,96,.12);border:1px solid var(--accent);color:var(--accent)}

.result{display:none;margin-top:20px}
.result.visible{display:block}
.result h3{font-size:18px;margin-bottom:10px}
.result pre{
  white-space:pre-wrap;word-wrap:break-word;font-family:inherit;line-height:1.6;font-size:15px;
  background:var(--bg-secondary);border:1px solid var(--border);border-radius:8px;padding:14px 18px;
}
</style>
</head>
<body>
<main>
  <h1>&#x1F9ED; Airbnb Search Agent</h1>

  <label for="query">Enter your travel plan:</label>
  <div class="row">
    <input id="query" type="text" autocomplete="off"
      placeholder="e.g. Find me a nice place to stay in Chennai for 4 adults from July 1st to 4th">
    <button id="search">Search</button>
  </div>

  <div id="spinner" class="spinner-row"><div class="spinner"></div><span>Thinking...</span></div>
  <div id="banner" class="banner"></div>
  <div id="result" class="result">
    <h3>&#x1F3E1; Result:</h3>
    <pre id="result-text"></pre>
  </div>
</main>

<script>
(function(){
  var input = document.getElementById('query');
  var button = document.getElementById('search');
  var spinner = document.getElementById('spinner');
  var banner = document.getElementById('banner');
  var result = document.getElementById('result');
  var resultText = document.getElementById('result-text');

  function showBanner(kind, text){
    banner.className = 'banner visible ' + kind;
    banner.textContent = text;
  }

  function reset(){
    banner.className = 'banner';
    result.className = 'result';
    resultText.textContent = '';
  }

  function search(){
    reset();
    var query = input.value;
    if (query.trim() === '') {
      showBanner('warning', 'Please enter a valid query.');
      return;
    }

    button.disabled = true;
    spinner.classList.add('active');

    fetch('/api/search', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({query: query})
    })
      .then(function(resp){ return resp.json(); })
      .then(function(data){
        if (data.status === 'success') {
          showBanner('success', 'Search completed!');
          resultText.textContent = data.result;
          result.className = 'result visible';
        } else if (data.status === 'warning') {
          showBanner('warning', data.message);
        } else {
          showBanner('failed', 'Search failed: ' + (data.error || 'unknown error'));
        }
      })
      .catch(function(err){
        showBanner('failed', 'Search failed: ' + err);
      })
      .finally(function(){
        spinner.classList.remove('active');
        button.disabled = false;
      });
  }

  button.addEventListener('click', search);
  input.addEventListener('keydown', function(e){
    if (e.key === 'Enter') search();
  });
})();
</script>
</body>
</html>
"##;
