//! Handlebars sources for the widget markup.
//!
//! The page talks to the server through HTMX only; the inline `hx-on`
//! handlers apply the sizes and resets the server decides on.

pub(super) const PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{{title}}</title>
    <script src="https://unpkg.com/htmx.org@2.0.8"></script>
    <script src="https://unpkg.com/htmx-ext-sse@2.2.2/sse.js"></script>
    <style>
        .chatbot { display: none; }
        #chat-visibility.shown ~ .chatbot { display: flex; flex-direction: column; }
        .chatbox { list-style: none; overflow-y: auto; max-height: 510px; padding: 0; }
        .chat.error p { color: #721c24; background: #f8d7da; }
        .chat-input textarea { resize: none; }
    </style>
</head>
<body>
    <div class="chat-widget">
        {{> visibility}}
        <div class="chatbot"
             hx-ext="sse"
             sse-connect="/widget/{{session_id}}/events"
             hx-on:input-resized="this.querySelector('#chat-input-field').style.height = event.detail.height + 'px'"
             hx-on:input-reset="const f = this.querySelector('#chat-input-field'); f.value = ''; f.style.height = event.detail.height + 'px'">
            <header>
                <h2>Chatbot</h2>
                <span class="close-btn"
                      hx-post="/widget/{{session_id}}/close"
                      hx-target="#chat-visibility"
                      hx-swap="outerHTML">close</span>
            </header>
            <ul class="chatbox" id="chatbox"
                sse-swap="entry"
                hx-swap="beforeend"
                hx-on::sse-message="this.scrollTo(0, this.scrollHeight)">
                {{#each entries}}{{> entry}}{{/each}}
            </ul>
            <form class="chat-input"
                  hx-post="/widget/{{session_id}}/send"
                  hx-swap="none">
                <textarea id="chat-input-field"
                          name="message"
                          placeholder="Enter a message..."
                          spellcheck="false"
                          style="height: {{input_height}}px"
                          hx-post="/widget/{{session_id}}/input"
                          hx-trigger="input"
                          hx-swap="none"
                          hx-on:keydown="if (event.key === 'Enter' && !event.shiftKey && !event.ctrlKey && !event.altKey && !event.metaKey && window.innerWidth >= {{desktop_min_width}}) event.preventDefault()"
                          required>{{input_value}}</textarea>
                <div hx-post="/widget/{{session_id}}/key"
                     hx-trigger="keydown[key=='Enter'] from:#chat-input-field"
                     hx-include="#chat-input-field"
                     hx-vals='js:{key: event.key, shift: event.shiftKey, ctrl: event.ctrlKey, alt: event.altKey, meta: event.metaKey, viewport_width: window.innerWidth}'
                     hx-swap="none"></div>
                <button type="submit" id="send-btn">send</button>
            </form>
        </div>
    </div>
</body>
</html>
"##;

pub(super) const VISIBILITY: &str = r##"<div id="chat-visibility" class="{{visibility}}">
            <button class="chatbot-toggler"
                    hx-post="/widget/{{session_id}}/toggle"
                    hx-target="#chat-visibility"
                    hx-swap="outerHTML">chat</button>
        </div>"##;

pub(super) const ENTRY: &str = r#"<li id="entry-{{id}}" class="chat {{role}}{{#if is_error}} error{{/if}}"{{#if oob}} hx-swap-oob="true"{{/if}}>{{#if is_incoming}}<span class="bot-avatar">bot</span>{{/if}}<p>{{text}}</p></li>"#;

pub(super) const TRANSCRIPT: &str = r"{{#each entries}}{{> entry}}{{/each}}";
