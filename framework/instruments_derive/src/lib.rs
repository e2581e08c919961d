use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitStr, ReturnType};

/// Time an async method and report it as an operation.
///
/// The method must be `async`, return a `Result` and be defined on a type with a `reporter`
/// field that dereferences to `proxy_bench_instruments::Reporter`. The operation id is the
/// method name, prefixed with `prefix` when given:
///
/// ```rust,ignore
/// #[bench_instrument(prefix = "pg_")]
/// pub async fn execute(&self, statement: &str) -> anyhow::Result<ExecuteOutcome> {
///     // reported as `pg_execute`
/// }
/// ```
#[proc_macro_attribute]
pub fn bench_instrument(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut prefix: Option<LitStr> = None;
    let args_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("prefix") {
            prefix = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported bench_instrument property"))
        }
    });
    parse_macro_input!(args with args_parser);

    let mut input = parse_macro_input!(input as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "bench_instrument can only be applied to async functions",
        )
        .to_compile_error()
        .into();
    }

    let operation_id = format!(
        "{}{}",
        prefix.map(|p| p.value()).unwrap_or_default(),
        input.sig.ident
    );

    let output_ty = match &input.sig.output {
        ReturnType::Type(_, ty) => quote!(#ty),
        ReturnType::Default => {
            return syn::Error::new_spanned(
                &input.sig,
                "bench_instrument requires a function that returns a Result",
            )
            .to_compile_error()
            .into();
        }
    };

    let body = &input.block;
    // The unreachable early return pins the async block's output type so that `?` inside the
    // original body can infer its error conversion.
    let instrumented: syn::Block = syn::parse_quote! {{
        let __operation_record = ::proxy_bench_instruments::OperationRecord::new(#operation_id);
        let __response: #output_ty = async {
            #[allow(unreachable_code, clippy::diverging_sub_expression)]
            if false {
                let __fake_return: #output_ty = loop {};
                return __fake_return;
            }
            #body
        }
        .await;
        ::proxy_bench_instruments::report_operation(&self.reporter, __operation_record, &__response);
        __response
    }};
    input.block = Box::new(instrumented);

    TokenStream::from(quote!(#input))
}
