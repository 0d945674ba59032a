mod api_tests;
mod page_tests;
mod support;
