//! A Gemini composer page built on `MemoryPage`

use std::rc::Rc;

use gemini_chat_history::capture::{CaptureMachine, CaptureOutcome, CaptureSettings, RecordStore};
use gemini_chat_history::page::{ClickEvent, MemoryPage, NodeId};
use gemini_chat_history::storage::KeyValueStore;

pub const APP_URL: &str = "https://gemini.google.com/app";

pub struct GeminiPage {
    pub page: MemoryPage,
    pub list: NodeId,
    pub send_button: NodeId,
    pub send_icon: NodeId,
    pub editor: NodeId,
}

impl GeminiPage {
    /// Composer with a model label, a prompt holding a code block, one
    /// attachment, a signed-in account and an empty conversation list
    pub fn new() -> Self {
        let page = MemoryPage::new(APP_URL);
        let root = page.root_id();

        let account = page
            .create_element("a")
            .with_attr("aria-label", "Google Account: Ada Lovelace (ada@example.com)");
        assert!(page.append_child(root, account));

        let list = page
            .create_element("conversations-list")
            .with_attr("data-test-id", "all-conversations");
        let list_id = list.id;
        let sidebar = page.create_element("side-navigation").with_child(list);
        assert!(page.append_child(root, sidebar));

        let label = page.create_element("span").with_text("2.5 Pro Experimental");
        let attribution = page
            .create_element("div")
            .with_attr("data-test-id", "attribution-text")
            .with_child(label);
        let switcher = page.create_element("bard-mode-switcher").with_child(attribution);
        assert!(page.append_child(root, switcher));

        let editor = page
            .create_element("div")
            .with_class("ql-editor textarea")
            .with_text("Plan a trip to Bali ```js\nconsole.log(1)\n```");
        let editor_id = editor.id;
        let textarea = page.create_element("rich-textarea").with_child(editor);

        let file_name = page
            .create_element("span")
            .with_attr("data-test-id", "file-name")
            .with_attr("title", "itinerary.pdf")
            .with_text("itinerary.p…");
        let preview = page
            .create_element("div")
            .with_class("file-preview")
            .with_child(file_name);
        let previews = page
            .create_element("uploader-file-preview-container")
            .with_child(preview);

        let icon = page
            .create_element("mat-icon")
            .with_attr("data-mat-icon-name", "send");
        let icon_id = icon.id;
        let button = page
            .create_element("button")
            .with_class("send-button")
            .with_attr("aria-label", "Send message")
            .with_child(icon);
        let button_id = button.id;

        let input = page
            .create_element("input-area-v2")
            .with_child(textarea)
            .with_child(previews)
            .with_child(button);
        assert!(page.append_child(root, input));

        Self {
            page,
            list: list_id,
            send_button: button_id,
            send_icon: icon_id,
            editor: editor_id,
        }
    }

    pub fn machine(&self, backend: Rc<dyn KeyValueStore>) -> CaptureMachine {
        CaptureMachine::new(
            Rc::new(self.page.clone()),
            Rc::new(self.page.clone()),
            RecordStore::new(backend),
            CaptureSettings::default(),
        )
    }

    /// Click on the icon inside the send button
    pub fn click_send(&self) -> ClickEvent {
        self.page
            .click_event(self.send_icon)
            .expect("send icon is in the document")
    }

    pub fn set_prompt(&self, text: &str) {
        assert!(self.page.set_text(self.editor, text));
    }

    /// Moves the page to `/app/<id>`
    pub fn resolve(&self, id: &str) {
        self.page.navigate(&format!("{}/{}", APP_URL, id));
    }

    /// Back to the composer for a new conversation
    pub fn new_chat(&self) {
        self.page.navigate(APP_URL);
    }

    /// Inserts a conversation item group as the sidebar does; returns the
    /// item and title ids
    pub fn insert_conversation(&self, title: &str) -> (NodeId, NodeId) {
        let cover = self
            .page
            .create_element("div")
            .with_class("conversation-title-cover");
        let title_el = self
            .page
            .create_element("div")
            .with_class("conversation-title gds-label-l")
            .with_text(title)
            .with_child(cover);
        let title_id = title_el.id;
        let item = self
            .page
            .create_element("div")
            .with_attr("data-test-id", "conversation")
            .with_attr("role", "button")
            .with_child(title_el);
        let item_id = item.id;
        let group = self
            .page
            .create_element("div")
            .with_class("conversation-items-container")
            .with_child(item);
        assert!(self.page.append_child(self.list, group));
        (item_id, title_id)
    }

    /// Delivers every queued batch to `machine`, collecting outcomes
    pub fn deliver(&self, machine: &mut CaptureMachine) -> Vec<CaptureOutcome> {
        self.page
            .take_batches()
            .into_iter()
            .filter_map(|(subscription, records)| machine.on_batch(subscription, &records))
            .collect()
    }
}
