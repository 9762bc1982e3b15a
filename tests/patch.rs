use std::{cell::Cell, rc::Rc};
use vnode_patch::{
	memory::{Document, Event, Mutation, NodeHandle},
	Differ, Dom, Error, EventHandler, Hooks, Node, Old, Params, Value,
};


type N = Node<Document>;
type P = Params<Document>;

fn differ() -> Differ<Document> {
	logging_::init();
	Differ::new(Document::new())
}

fn text(text: &str) -> N {
	P::text(text).build().unwrap()
}

fn li(key: &str) -> N {
	P::element("li").key(key).child(key).build().unwrap()
}

fn structural(mutations: &[Mutation]) -> Vec<&Mutation> {
	mutations.iter().filter(|mutation| mutation.is_structural()).collect()
}

#[test]
fn initial_text() {
	let mut differ = differ();
	let hello = text("Hello!");
	let handle = differ.patch(Old::Absent, &hello).unwrap();

	assert_eq!(hello.binding(), Some(&handle));
	assert_eq!(differ.dom().text(handle), Some("Hello!"));
}

#[test]
fn initial_element() {
	let mut differ = differ();
	let tree = P::element("div")
		.prop("id", "x")
		.class("a", true)
		.class("b", false)
		.style("minHeight", "1px")
		.child(P::element("p").child("hi").build().unwrap())
		.build()
		.unwrap();
	let handle = differ.patch(Old::Absent, &tree).unwrap();

	assert_eq!(differ.dom().to_html(handle), r#"<div class="a" id="x" style="min-height: 1px;"><p>hi</p></div>"#);
	let p = differ.dom().children(handle)[0];
	assert_eq!(tree.children()[0].binding(), Some(&p));
	assert_eq!(tree.children()[0].children()[0].binding(), Some(&differ.dom().children(p)[0]));
}

#[test]
fn attribute_diff() {
	let mut differ = differ();
	let v1 = P::element("div")
		.class("a", true)
		.prop("title", "t")
		.prop("id", "x")
		.style("color", "red")
		.child("x")
		.build()
		.unwrap();
	let handle = differ.patch(Old::Absent, &v1).unwrap();
	differ.dom_mut().take_mutations();

	let v2 = P::element("div").class("a", true).class("b", true).prop("id", "y").child("x").build().unwrap();
	assert_eq!(differ.patch(&v1, &v2).unwrap(), handle);

	assert_eq!(
		differ.dom_mut().take_mutations(),
		[
			Mutation::ToggleClass {
				node: handle,
				name: "b".to_owned(),
				on: true
			},
			Mutation::SetProperty {
				node: handle,
				name: "id".to_owned(),
				value: "y".into()
			},
			Mutation::ResetProperty {
				node: handle,
				name: "title".to_owned()
			},
			Mutation::ClearStyle {
				node: handle,
				name: "color".to_owned()
			},
		]
	);
	assert_eq!(differ.dom().to_html(handle), r#"<div class="a b" id="y">x</div>"#);
}

#[test]
fn single_attribute_change() {
	let mut differ = differ();
	let v1 = P::element("div").prop("id", "id1").class("c", true).style("color", "red").build().unwrap();
	let div = differ.patch(Old::Absent, &v1).unwrap();
	differ.dom_mut().take_mutations();

	let v2 = P::element("div").prop("id", "id2").class("c", true).style("color", "red").build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(
		differ.dom().mutations(),
		[Mutation::SetProperty {
			node: div,
			name: "id".to_owned(),
			value: "id2".into()
		}]
	);
}

#[test]
fn sequential_text_updates() {
	let mut differ = differ();
	let mut old = P::element("p").child("0").build().unwrap();
	let handle = differ.patch(Old::Absent, &old).unwrap();
	let text_handle = differ.dom().children(handle)[0];

	for i in 1..5 {
		let new = P::element("p").child(i).build().unwrap();
		assert_eq!(differ.patch(&old, &new).unwrap(), handle);
		assert_eq!(differ.dom().children(handle), [text_handle]);
		assert_eq!(differ.dom().text_content(handle), i.to_string());
		old = new;
	}
}

#[test]
fn same_tree_is_a_no_op() {
	let mut differ = differ();
	let updates = Rc::new(Cell::new(0));
	let hooks = Hooks::<Document>::new().on_update({
		let updates = Rc::clone(&updates);
		move |_, _| updates.set(updates.get() + 1)
	});
	let tree = P::element("ul").hooks(hooks).children([li("a"), li("b")]).build().unwrap();
	let handle = differ.patch(Old::Absent, &tree).unwrap();
	differ.dom_mut().take_mutations();
	// From the placeholder of the fresh build.
	assert_eq!(updates.get(), 1);

	assert_eq!(differ.patch(&tree, &tree).unwrap(), handle);
	assert_eq!(differ.patch(&tree, &tree).unwrap(), handle);
	assert!(differ.dom().mutations().is_empty());
	assert_eq!(updates.get(), 1);
}

#[test]
fn keyed_reorder_moves_elements() {
	let mut differ = differ();
	let [a, b, c, d] = [li("a"), li("b"), li("c"), li("d")];
	let v1 = P::element("ul").children([&a, &b, &c, &d]).build().unwrap();
	let ul = differ.patch(Old::Absent, &v1).unwrap();
	let handles: Vec<NodeHandle> = [&a, &b, &c, &d].iter().map(|node| *node.binding().unwrap()).collect();
	differ.dom_mut().take_mutations();

	let v2 = P::element("ul").children([&d, &c, &a, &b]).build().unwrap();
	assert_eq!(differ.patch(&v1, &v2).unwrap(), ul);

	assert_eq!(differ.dom().children(ul), [handles[3], handles[2], handles[0], handles[1]]);
	assert_eq!(differ.dom().text_content(ul), "dcab");
	let mutations = differ.dom_mut().take_mutations();
	assert!(mutations.iter().all(|mutation| matches!(mutation, Mutation::Insert { .. })));
	assert_eq!(mutations.len(), 2);
}

#[test]
fn retained_children_survive_insertion_and_removal() {
	let mut differ = differ();
	let [a, b, c] = [li("a"), li("b"), li("c")];
	let v1 = P::element("ul").children([&a, &b, &c]).build().unwrap();
	let ul = differ.patch(Old::Absent, &v1).unwrap();
	let c_handle = *c.binding().unwrap();

	let x = li("x");
	let v2 = P::element("ul").children([&x, &c]).build().unwrap();
	differ.patch(&v1, &v2).unwrap();

	assert_eq!(differ.dom().text_content(ul), "xc");
	assert_eq!(differ.dom().children(ul)[1], c_handle);
	assert_eq!(differ.dom().parent_of(*b.binding().unwrap()), None);
}

#[test]
fn replace_on_tag_change() {
	let mut differ = differ();
	let replacements = Rc::new(Cell::new(None));
	let span = P::element("span")
		.hooks(Hooks::<Document>::new().on_detach({
			let replacements = Rc::clone(&replacements);
			move |_, replacement| replacements.set(replacement.copied())
		}))
		.child("a")
		.build()
		.unwrap();
	let v1 = P::element("div").child(&span).build().unwrap();
	let div = differ.patch(Old::Absent, &v1).unwrap();
	let span_handle = *span.binding().unwrap();

	let p = P::element("p").child("a").build().unwrap();
	let v2 = P::element("div").child(&p).build().unwrap();
	differ.patch(&v1, &v2).unwrap();

	let p_handle = *p.binding().unwrap();
	assert_ne!(p_handle, span_handle);
	assert_eq!(differ.dom().to_html(div), "<div><p>a</p></div>");
	assert_eq!(differ.dom().parent_of(span_handle), None);
	assert_eq!(replacements.get(), Some(p_handle));
}

#[test]
fn replace_on_key_change() {
	let mut differ = differ();
	let v1 = P::element("ul").child(li("a")).build().unwrap();
	let ul = differ.patch(Old::Absent, &v1).unwrap();
	let old_li = differ.dom().children(ul)[0];

	let v2 = P::element("ul").child(li("b")).build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_ne!(differ.dom().children(ul)[0], old_li);
	assert_eq!(differ.dom().text_content(ul), "b");
}

#[test]
fn replace_on_kind_change() {
	let mut differ = differ();
	let v1 = P::element("div").child("text").build().unwrap();
	let div = differ.patch(Old::Absent, &v1).unwrap();

	let v2 = P::element("div").child(P::element("br").build().unwrap()).build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(differ.dom().to_html(div), "<div><br></br></div>");
}

#[test]
fn top_level_replacement_is_returned() {
	let mut differ = differ();
	let v1 = P::element("div").build().unwrap();
	let div = differ.patch(Old::Absent, &v1).unwrap();

	let v2 = P::element("section").build().unwrap();
	let section = differ.patch(&v1, &v2).unwrap();
	assert_ne!(section, div);
	assert_eq!(differ.dom().tag(section), Some("section"));
}

#[test]
fn removed_properties_return_to_defaults() {
	let mut differ = differ();
	differ.dom_mut().declare_default("input", "value", "");
	let v1 = P::element("input").prop("value", "typed").build().unwrap();
	let input = differ.patch(Old::Absent, &v1).unwrap();

	let v2 = P::element("input").build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(differ.dom().property(input, "value"), Some(&Value::from("")));
}

#[test]
fn handlers_are_compared_by_identity() {
	let mut differ = differ();
	let clicks = Rc::new(Cell::new((0, 0)));
	let first = EventHandler::<Event>::new({
		let clicks = Rc::clone(&clicks);
		move |_| clicks.set((clicks.get().0 + 1, clicks.get().1))
	});
	let second = EventHandler::<Event>::new({
		let clicks = Rc::clone(&clicks);
		move |_| clicks.set((clicks.get().0, clicks.get().1 + 1))
	});

	let v1 = P::element("button").on("click", first.clone()).build().unwrap();
	let button = differ.patch(Old::Absent, &v1).unwrap();
	assert_eq!(differ.dom().dispatch(button, "click"), 1);
	differ.dom_mut().take_mutations();

	let v2 = P::element("button").on("click", first.clone()).build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert!(differ.dom().mutations().is_empty());

	let v3 = P::element("button").on("click", second).build().unwrap();
	differ.patch(&v2, &v3).unwrap();
	assert_eq!(differ.dom().listener_count(button, "click"), 1);
	assert_eq!(differ.dom().dispatch(button, "click"), 1);
	assert_eq!(clicks.get(), (1, 1));

	let v4 = P::element("button").build().unwrap();
	differ.patch(&v3, &v4).unwrap();
	assert_eq!(differ.dom().dispatch(button, "click"), 0);
}

#[test]
fn adopts_existing_markup() {
	let mut differ = differ();
	let dom = differ.dom_mut();
	let div = dom.create_element("div");
	let p = dom.create_element("p");
	let hello = dom.create_text("hello");
	let comment = dom.create_comment("server");
	dom.append_child(p, hello);
	dom.append_child(div, p);
	dom.append_child(div, comment);
	dom.take_mutations();

	let tree = P::element("div").child(P::element("p").child("hello").build().unwrap()).build().unwrap();
	assert_eq!(differ.patch(Old::Existing(div), &tree).unwrap(), div);
	assert!(differ.dom().mutations().is_empty());
	assert_eq!(tree.children()[0].binding(), Some(&p));
	assert_eq!(differ.dom().children(div), [p, comment]);

	let changed = P::element("div").child(P::element("p").child("bye").build().unwrap()).build().unwrap();
	differ.patch(&tree, &changed).unwrap();
	assert_eq!(differ.dom().children(p), [hello]);
	assert_eq!(differ.dom().text(hello), Some("bye"));
}

#[test]
fn unadoptable_existing_node_is_ignored() {
	let mut differ = differ();
	let comment = differ.dom_mut().create_comment("not an element");
	let tree = P::element("div").build().unwrap();
	let div = differ.patch(Old::Existing(comment), &tree).unwrap();
	assert_ne!(div, comment);
	assert_eq!(differ.dom().tag(div), Some("div"));
}

#[test]
fn unrendered_old_is_treated_as_absent() {
	let mut differ = differ();
	let never_rendered = P::element("div").child("old").build().unwrap();
	let tree = P::element("div").child("new").build().unwrap();
	let div = differ.patch(&never_rendered, &tree).unwrap();
	assert_eq!(differ.dom().to_html(div), "<div>new</div>");
	assert!(!never_rendered.is_bound());
}

#[test]
fn unrendered_old_against_bound_new_creates_nothing() {
	let mut differ = differ();
	let x = P::element("p").child("x").build().unwrap();
	let handle = differ.patch(Old::Absent, &x).unwrap();
	differ.dom_mut().take_mutations();

	let never_rendered = P::element("div").build().unwrap();
	assert_eq!(differ.patch(&never_rendered, &x).unwrap(), handle);
	assert!(!differ
		.dom()
		.mutations()
		.iter()
		.any(|mutation| matches!(mutation, Mutation::CreateElement { .. } | Mutation::CreateText { .. })));
	assert!(!never_rendered.is_bound());
}

#[test]
fn reuse_within_pass() {
	let mut differ = differ();
	let shared = text("shared");
	let tree = P::element("div")
		.child(P::element("p").child(&shared).build().unwrap())
		.child(P::element("p").child(&shared).build().unwrap())
		.build()
		.unwrap();

	let error = differ.patch(Old::Absent, &tree).unwrap_err();
	assert_eq!(
		error,
		Error::ReuseWithinPass {
			node: shared.id(),
			pass: differ.last_pass().unwrap()
		}
	);
}

#[test]
fn reuse_after_update() {
	let mut differ = differ();
	let v1 = P::element("div").child("a").build().unwrap();
	differ.patch(Old::Absent, &v1).unwrap();
	let v2 = P::element("div").child("b").build().unwrap();
	differ.patch(&v1, &v2).unwrap();

	let v3 = P::element("div").child("c").build().unwrap();
	assert_eq!(differ.patch(&v1, &v3).unwrap_err(), Error::ReuseAfterUpdate { node: v1.id() });
	assert_eq!(structural(differ.dom().mutations()).len(), 1);
}

#[test]
fn reusing_an_updated_node_as_new() {
	let mut differ = differ();
	let v1 = P::element("div").child("a").build().unwrap();
	differ.patch(Old::Absent, &v1).unwrap();
	let v2 = P::element("div").child("b").build().unwrap();
	differ.patch(&v1, &v2).unwrap();

	assert_eq!(differ.patch(Old::Absent, &v1).unwrap_err(), Error::ReuseAfterUpdate { node: v1.id() });
}

#[test]
fn unkeyed_wrapper_takes_over_its_child() {
	let mut differ = differ();
	let inner = P::element("p").child("a").build().unwrap();
	let v1 = P::element("div").child(&inner).build().unwrap();
	differ.patch(Old::Absent, &v1).unwrap();

	let v2 = P::element("div").child(P::element("p").child(&inner).build().unwrap()).build().unwrap();
	assert_eq!(
		differ.patch(&v1, &v2).unwrap_err(),
		Error::ReuseWithinPass {
			node: inner.id(),
			pass: differ.last_pass().unwrap()
		}
	);
}

#[test]
fn keyed_wrapper_keeps_its_child() {
	let mut differ = differ();
	let inner = P::element("p").child("a").build().unwrap();
	let v1 = P::element("div").child(&inner).build().unwrap();
	let div = differ.patch(Old::Absent, &v1).unwrap();
	let inner_handle = *inner.binding().unwrap();

	let v2 = P::element("div").child(P::element("p").key("wrapper").child(&inner).build().unwrap()).build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(differ.dom().to_html(div), "<div><p><p>a</p></p></div>");
	assert_eq!(inner.binding(), Some(&inner_handle));
	assert_eq!(differ.dom().parent_of(inner_handle), Some(*v2.children()[0].binding().unwrap()));
}

fn clickable(tag: &str, handler: &EventHandler<Event>) -> N {
	P::element(tag).on("click", handler.clone()).build().unwrap()
}

#[test]
fn removed_subtrees_release_their_listeners() {
	let mut differ = differ();
	let handler = EventHandler::<Event>::new(|_| ());
	let (button, link) = (clickable("button", &handler), clickable("a", &handler));
	let v1 = P::element("div").child(&button).child(P::element("p").child(&link).build().unwrap()).build().unwrap();
	differ.patch(Old::Absent, &v1).unwrap();
	let (button_handle, link_handle) = (*button.binding().unwrap(), *link.binding().unwrap());
	assert_eq!(differ.dom().listener_count(link_handle, "click"), 1);

	let v2 = P::element("div").build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(differ.dom().listener_count(button_handle, "click"), 0);
	assert_eq!(differ.dom().listener_count(link_handle, "click"), 0);
}

#[test]
fn replaced_nodes_release_their_listeners() {
	let mut differ = differ();
	let handler = EventHandler::<Event>::new(|_| ());
	let button = clickable("button", &handler);
	let v1 = P::element("div").child(&button).build().unwrap();
	differ.patch(Old::Absent, &v1).unwrap();
	let button_handle = *button.binding().unwrap();

	let v2 = P::element("div").child(clickable("span", &handler)).build().unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(differ.dom().listener_count(button_handle, "click"), 0);
	assert_eq!(differ.dom().listener_count(*v2.children()[0].binding().unwrap(), "click"), 1);
}

#[test]
fn moved_nodes_keep_their_listeners() {
	let mut differ = differ();
	let clicks = Rc::new(Cell::new(0));
	let handler = EventHandler::<Event>::new({
		let clicks = Rc::clone(&clicks);
		move |_| clicks.set(clicks.get() + 1)
	});
	let button = clickable("button", &handler);
	let v1 = P::element("div")
		.child(P::element("section").child(&button).build().unwrap())
		.child(P::element("aside").build().unwrap())
		.build()
		.unwrap();
	differ.patch(Old::Absent, &v1).unwrap();
	let button_handle = *button.binding().unwrap();

	// Removed from the section before it's placed into the aside.
	let v2 = P::element("div")
		.child(P::element("section").build().unwrap())
		.child(P::element("aside").child(&button).build().unwrap())
		.build()
		.unwrap();
	differ.patch(&v1, &v2).unwrap();
	assert_eq!(differ.dom().listener_count(button_handle, "click"), 1);
	assert_eq!(differ.dom().dispatch(button_handle, "click"), 1);
	assert_eq!(clicks.get(), 1);
}
