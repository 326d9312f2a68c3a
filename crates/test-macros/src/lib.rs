use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt, ReturnType};

/// `#[test]` with a wall-clock budget (default: 1 second).
///
/// The elapsed time goes to stderr. A test over budget fails even when its
/// body passed. Test bodies may return a `Result`; an `Err` fails the test
/// with its `Debug` rendering.
///
/// ```ignore
/// use test_macros::timed_test;
///
/// #[timed_test]
/// fn quick() {
///     assert_eq!(2 + 2, 4);
/// }
///
/// #[timed_test(60)]
/// fn loads_a_game() -> Result<(), Box<dyn std::error::Error>> {
///     let game = TwoPlayerZeroSumGame::load("tests/data/kuhn.json")?;
///     assert_eq!(game.row.num_sequences(), 13);
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn timed_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let budget_secs: u64 = if attr.is_empty() {
        1
    } else {
        let lit = parse_macro_input!(attr as LitInt);
        match lit.base10_parse::<u64>() {
            Ok(secs) => secs,
            Err(err) => return err.to_compile_error().into(),
        }
    };

    let input_fn = parse_macro_input!(item as ItemFn);
    if let Some(asyncness) = &input_fn.sig.asyncness {
        return syn::Error::new_spanned(asyncness, "timed_test does not support async tests")
            .to_compile_error()
            .into();
    }
    if !input_fn.sig.inputs.is_empty() {
        return syn::Error::new_spanned(&input_fn.sig.inputs, "timed_test functions take no arguments")
            .to_compile_error()
            .into();
    }

    let fn_name = &input_fn.sig.ident;
    let fn_block = &input_fn.block;
    let fn_attrs = &input_fn.attrs;
    let fn_vis = &input_fn.vis;

    let run = match &input_fn.sig.output {
        ReturnType::Default => quote! { (|| #fn_block)() },
        ReturnType::Type(_, ty) => quote! {
            if let ::std::result::Result::Err(__timed_err) = (|| -> #ty #fn_block)() {
                panic!("{} returned an error: {:?}", stringify!(#fn_name), __timed_err);
            }
        },
    };

    let expanded = quote! {
        #(#fn_attrs)*
        #[test]
        #fn_vis fn #fn_name() {
            let __timed_start = ::std::time::Instant::now();
            let __timed_outcome = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| { #run; }));
            let __timed_elapsed = __timed_start.elapsed();

            eprintln!(
                "[timer] {} completed in {:.3}s",
                stringify!(#fn_name),
                __timed_elapsed.as_secs_f64()
            );
            if let ::std::result::Result::Err(__timed_payload) = __timed_outcome {
                ::std::panic::resume_unwind(__timed_payload);
            }
            if __timed_elapsed.as_secs() >= #budget_secs {
                panic!(
                    "[timer] {} exceeded its {}s budget ({:.3}s)",
                    stringify!(#fn_name),
                    #budget_secs,
                    __timed_elapsed.as_secs_f64()
                );
            }
        }
    };

    expanded.into()
}
